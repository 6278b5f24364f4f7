//! Engine server CLI: `server [port] [host]` (spec §6).

use clap::Parser;
use limitbook::config::{ServerArgs, ORDER_BOOK_INIT_SIZE, SOCKET_BUFFER_SIZE, SOCKET_FLUSH_THRESHOLD};
use limitbook::server::Server;

fn main() {
    // clap's own exit code for usage errors is 2; spec reserves 2 for
    // runtime failures and wants 1 for a bad argument list, so handle the
    // parse error ourselves rather than calling `ServerArgs::parse()`.
    let args = match ServerArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            eprint!("{err}");
            std::process::exit(1);
        }
    };

    let filter = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    let mut server: Server<SOCKET_BUFFER_SIZE> = Server::new(ORDER_BOOK_INIT_SIZE, SOCKET_FLUSH_THRESHOLD);
    if let Err(err) = server.listen(&args.host, &args.port.to_string()) {
        tracing::error!(error = %err, "server exited");
        std::process::exit(2);
    }
}
