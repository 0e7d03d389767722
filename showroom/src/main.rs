use std::{env, sync::Arc};

use actix_web::HttpServer;
use mongodb::Client;

use common::{
    context::ServiceState,
    entities::{
        business::Business, contact::Contact, dealership::Dealership, part::Part, post::Post,
        service_booking::ServiceBooking, special_offer::SpecialOffer, vehicle::Vehicle,
        weekly_special::WeeklySpecial,
    },
    media::cloudinary::{Cloudinary, CloudinaryConfig},
    repository::mongo_repository::MongoRepository,
    schema::Schema,
    services::DATABASE,
    verification::verify,
};
use showroom::create_app;

fn repository<T: Schema>(client: &Client) -> Arc<MongoRepository<T>> {
    Arc::new(MongoRepository::new(client, &DATABASE, T::COLLECTION))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let mongo_uri = env::var("MONGOURI").expect("MONGOURI must be set");
    let port = env::var("PORT")
        .ok()
        .and_then(|port| port.parse::<u16>().ok())
        .unwrap_or(3000);

    let client = Client::with_uri_str(&mongo_uri)
        .await
        .expect("Mongo client creation fail");

    verify::<Dealership>(&client, &DATABASE, true)
        .await
        .expect("Dealerships collection verification fail");
    verify::<Vehicle>(&client, &DATABASE, true)
        .await
        .expect("Vehicles collection verification fail");
    verify::<SpecialOffer>(&client, &DATABASE, true)
        .await
        .expect("Special offers collection verification fail");
    verify::<WeeklySpecial>(&client, &DATABASE, true)
        .await
        .expect("Weekly specials collection verification fail");
    verify::<Post>(&client, &DATABASE, true)
        .await
        .expect("Posts collection verification fail");
    verify::<Part>(&client, &DATABASE, true)
        .await
        .expect("Parts collection verification fail");
    verify::<ServiceBooking>(&client, &DATABASE, true)
        .await
        .expect("Services collection verification fail");
    verify::<Business>(&client, &DATABASE, false)
        .await
        .expect("Businesses collection verification fail");
    verify::<Contact>(&client, &DATABASE, true)
        .await
        .expect("Contacts collection verification fail");

    let dealership_repo = repository::<Dealership>(&client);
    dealership_repo
        .ensure_unique(Dealership::UNIQUE)
        .await
        .expect("Dealership index creation fail");

    let media = Cloudinary::new(CloudinaryConfig::from_env().expect("Cloudinary config missing"))
        .expect("Cloudinary client creation fail");

    let mut state = ServiceState::new(Arc::new(media));
    state.insert::<Dealership>(dealership_repo);
    state.insert::<Vehicle>(repository::<Vehicle>(&client));
    state.insert::<SpecialOffer>(repository::<SpecialOffer>(&client));
    state.insert::<WeeklySpecial>(repository::<WeeklySpecial>(&client));
    state.insert::<Post>(repository::<Post>(&client));
    state.insert::<Part>(repository::<Part>(&client));
    state.insert::<ServiceBooking>(repository::<ServiceBooking>(&client));
    state.insert::<Business>(repository::<Business>(&client));
    state.insert::<Contact>(repository::<Contact>(&client));
    let state = Arc::new(state);

    log::info!("Listening on 0.0.0.0:{}", port);
    HttpServer::new(move || create_app(state.clone()))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
