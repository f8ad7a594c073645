use heatlink_session::list_serial_ports;

use crate::cmd::PortsArgs;
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_endpoints, OutputFormat};

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoints =
        list_serial_ports().map_err(|err| session_error("port enumeration failed", err))?;
    print_endpoints(&endpoints, format);
    Ok(SUCCESS)
}
