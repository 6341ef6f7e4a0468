use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("rsmux {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: rsmux");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("transports: ws, wss, tcp");
    println!(
        "defaults: keep_alive={:?}, lifetime={:?}, max_reconnect_attempts={}, reconnect_delay={:?}",
        rsmux_client::DEFAULT_KEEP_ALIVE,
        rsmux_client::DEFAULT_LIFETIME,
        rsmux_client::reconnect::DEFAULT_MAX_RECONNECT_ATTEMPTS,
        rsmux_client::reconnect::DEFAULT_RECONNECT_DELAY,
    );
    println!("features: cli={}", cfg!(feature = "cli"));

    Ok(SUCCESS)
}
