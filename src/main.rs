use showroom_auth::{Config, build_rocket};

#[rocket::launch]
fn rocket() -> _ {
    dotenvy::dotenv().ok();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = config.validate() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    build_rocket(config)
}
