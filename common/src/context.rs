use std::sync::Arc;

use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use anyhow::anyhow;
use type_map::concurrent::TypeMap;

use crate::{
    error::{self, AddCode, ServiceError},
    media::{MediaObject, MediaStore},
    repository::RepositoryObject,
};

pub struct ServiceState {
    pub repositories: TypeMap,
    pub media: MediaObject,
}

impl ServiceState {
    pub fn new(media: MediaObject) -> Self {
        Self {
            repositories: TypeMap::new(),
            media,
        }
    }

    pub fn insert<T: 'static>(&mut self, repository: RepositoryObject<T>) {
        self.repositories.insert(repository);
    }
}

#[derive(Clone)]
pub struct Context(pub Arc<ServiceState>);

impl Context {
    pub fn get_repository<T: 'static>(&self) -> Option<RepositoryObject<T>> {
        self.0.repositories.get::<RepositoryObject<T>>().cloned()
    }

    pub fn try_get_repository<T: 'static>(&self) -> error::Result<RepositoryObject<T>> {
        self.get_repository::<T>().ok_or(
            anyhow!(
                "Repository for type {} not found",
                std::any::type_name::<T>()
            )
            .code(500),
        )
    }

    pub fn media(&self) -> &dyn MediaStore {
        self.0.media.as_ref()
    }
}

impl FromRequest for Context {
    type Error = ServiceError;

    type Future = futures_util::future::LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        fn from_request_inner(req: &HttpRequest, _payload: &mut Payload) -> error::Result<Context> {
            let Some(state) = req.app_data::<Data<Arc<ServiceState>>>() else {
                return Err(anyhow!("No state provided").code(500));
            };
            Ok(Context(Arc::clone(state)))
        }
        let result = from_request_inner(req, payload);

        Box::pin(async move { result })
    }
}
