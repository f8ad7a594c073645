use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("heatlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: heatlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("HEATLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "features: session={}, serial={}, cli=true",
        cfg!(feature = "session"),
        cfg!(feature = "serial"),
    );
    println!(
        "wire: transmit_capacity={}, end_marker=0x{:02x}",
        heatlink_frame::DEFAULT_CAPACITY,
        heatlink_frame::END_MARKER
    );

    Ok(SUCCESS)
}
