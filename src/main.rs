use env_logger::Env;
use vantage::AppConfig;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn,vantage=info")).init();

    let config = AppConfig::from_env();
    log::info!("starting {} at {}x{}", config.title, config.width, config.height);

    if let Err(err) = vantage::run(config) {
        log::error!("{err}");
        std::process::exit(1);
    }
}
