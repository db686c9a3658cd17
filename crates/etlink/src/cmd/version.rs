use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("etlink {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: etlink");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("ETLINK_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "profile: {}",
        option_env!("ETLINK_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "features: channel={}, async={}, cli=true",
        cfg!(feature = "channel"),
        cfg!(feature = "async")
    );
    println!(
        "frame: sync={:02X} {:02X}, max_payload={}",
        etlink_frame::SYNC[0],
        etlink_frame::SYNC[1],
        etlink_frame::MAX_PAYLOAD
    );

    Ok(SUCCESS)
}
