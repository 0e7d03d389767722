pub mod handlers;
pub mod service;

#[cfg(any(test, feature = "test_server"))]
pub mod test_utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::ServiceFactory;
use actix_web::dev::ServiceRequest;
use actix_web::dev::ServiceResponse;
use actix_web::middleware;
use actix_web::web;
use actix_web::App;

use common::context::ServiceState;
use common::entities::{
    business::Business, contact::Contact, dealership::Dealership, part::Part, post::Post,
    service_booking::ServiceBooking, special_offer::SpecialOffer, vehicle::Vehicle,
    weekly_special::WeeklySpecial,
};
use common::services::API_PREFIX;
pub use handlers::dealership::*;
pub use handlers::ping;
use handlers::resource::{resource_scope, status_routes};

pub fn create_app(
    state: Arc<ServiceState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let cors = Cors::permissive();
    let app = App::new()
        .wrap(cors)
        .wrap(middleware::Logger::default())
        .app_data(web::Data::new(state))
        .service(
            web::scope(&API_PREFIX)
                .service(ping)
                .service(resource_scope::<Dealership>(
                    web::scope("/dealerships")
                        .service(search_dealerships)
                        .service(dealership_names),
                    "/totalDealer",
                ))
                .service(resource_scope::<Vehicle>(
                    web::scope("/vehicles"),
                    "/totalVehical",
                ))
                .service(resource_scope::<SpecialOffer>(
                    web::scope("/special-offers"),
                    "/totalOffers",
                ))
                .service(resource_scope::<WeeklySpecial>(
                    web::scope("/weekly-specials"),
                    "/totalWeekly",
                ))
                .service(resource_scope::<Post>(web::scope("/posts"), "/totalPosts"))
                .service(resource_scope::<Part>(
                    status_routes::<Part>(web::scope("/parts")),
                    "/totalParts",
                ))
                .service(resource_scope::<ServiceBooking>(
                    status_routes::<ServiceBooking>(web::scope("/services")),
                    "/totalService",
                ))
                .service(resource_scope::<Business>(
                    web::scope("/businesses"),
                    "/totalBusiness",
                ))
                .service(resource_scope::<Contact>(
                    status_routes::<Contact>(web::scope("/contact")),
                    "/totalContact",
                )),
        );
    app
}

#[cfg(any(test, feature = "test_server"))]
pub fn create_test_app() -> App<
    impl ServiceFactory<
        ServiceRequest,
        Response = ServiceResponse<impl MessageBody>,
        Config = (),
        InitError = (),
        Error = actix_web::Error,
    >,
> {
    let (state, _) = test_utils::test_state();
    create_app(state)
}
