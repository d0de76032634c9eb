use std::env;

#[tokio::main]
async fn main() {
    nestegg::telemetry::init_tracing();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        if let Err(e) = nestegg::api::run_http_server(port).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    match nestegg::api::run_cli(raw_args) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!(
                "Usage: nestegg serve [port] | nestegg --current-age N --retirement-age N \
                 --life-expectancy N --monthly-expense X [options]"
            );
            std::process::exit(1);
        }
    }
}
