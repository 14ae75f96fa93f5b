//! Shared fixtures for the connection suites.

mod logs;
mod transport;
mod world;

pub use logs::CapturedLogs;
pub use transport::RecordingTransport;
pub use world::TestWorld;

use crate::{Connection, ConnectionOptions, ParamSpec, TypeTag};

/// Builds a connection over `transport` with a small protocol registered.
///
/// - `Math.add(x: number)` returns `sum`.
/// - `Runtime.evaluate(expression: string, objectGroup?: string)` returns
///   `result` and `wasThrown`.
/// - `Page.enable()` returns nothing.
/// - `Network.dataReceived` carries `requestId, timestamp, dataLength,
///   encodedDataLength`.
pub fn connection_with_protocol(
    transport: &RecordingTransport,
    options: ConnectionOptions,
) -> Connection {
    let connection = Connection::new(transport.clone(), options);
    connection
        .register_command(
            "Math.add",
            vec![ParamSpec::required("x", TypeTag::Number)],
            vec![String::from("sum")],
        )
        .expect("register Math.add");
    connection
        .register_command(
            "Runtime.evaluate",
            vec![
                ParamSpec::required("expression", TypeTag::String),
                ParamSpec::optional("objectGroup", TypeTag::String),
            ],
            vec![String::from("result"), String::from("wasThrown")],
        )
        .expect("register Runtime.evaluate");
    connection
        .register_command("Page.enable", Vec::new(), Vec::new())
        .expect("register Page.enable");
    connection
        .register_event(
            "Network.dataReceived",
            ["requestId", "timestamp", "dataLength", "encodedDataLength"]
                .map(String::from)
                .to_vec(),
        )
        .expect("register Network.dataReceived");
    connection
}
