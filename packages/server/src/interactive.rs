//! Interactive mode for the server.
//!
//! Prompts for the bind address and port before starting the server.

use dialoguer::{Confirm, Input};

use crate::ServerOptions;

/// Runs the server in interactive mode, prompting for where to listen.
///
/// Defaults come from `BIND_ADDR` / `PORT`. Logging must already be
/// initialized by the caller.
///
/// # Errors
///
/// Returns an `std::io::Result` error if the underlying server fails to
/// start.
#[allow(clippy::future_not_send)]
pub async fn run() -> std::io::Result<()> {
    println!("Site Engine Server");
    println!();

    let defaults = ServerOptions::from_env();

    let bind_addr: String = Input::new()
        .with_prompt("Bind address")
        .default(defaults.bind_addr.clone())
        .interact_text()
        .unwrap_or_else(|_| defaults.bind_addr.clone());

    let port: u16 = Input::new()
        .with_prompt("Port")
        .default(defaults.port)
        .interact_text()
        .unwrap_or(defaults.port);

    if !Confirm::new()
        .with_prompt(format!("Start server on {bind_addr}:{port}?"))
        .default(true)
        .interact()
        .unwrap_or(true)
    {
        println!("Cancelled.");
        return Ok(());
    }

    super::serve(ServerOptions { bind_addr, port }).await
}
