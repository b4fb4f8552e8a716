//! Line-delimited stdio transport.
//!
//! Reads one JSON-RPC message per line and writes one response per line.
//! Stdout carries protocol frames only.

use std::io::{self, BufRead, Write};

use emotions_core::EmotionRepository;
use log::info;

use crate::protocol::JsonRpcResponse;
use crate::server::EmotionsMcpServer;

/// Serves process stdin/stdout until stdin closes.
pub fn serve<R>(server: &EmotionsMcpServer<R>) -> io::Result<()>
where
    R: EmotionRepository + Send + Sync + 'static,
{
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve_lines(server, stdin.lock(), stdout.lock())
}

/// Serves `input` until EOF, writing responses to `output`.
pub fn serve_lines<R, I, O>(server: &EmotionsMcpServer<R>, input: I, mut output: O) -> io::Result<()>
where
    R: EmotionRepository + Send + Sync + 'static,
    I: BufRead,
    O: Write,
{
    let mut handled = 0_u64;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        handled += 1;
        if let Some(response) = server.handle_message(&line) {
            write_response(&mut output, &response)?;
        }
    }

    info!("event=stdio_closed module=transport status=ok messages={handled}");
    Ok(())
}

fn write_response<O: Write>(output: &mut O, response: &JsonRpcResponse) -> io::Result<()> {
    serde_json::to_writer(&mut *output, response)?;
    writeln!(output)?;
    output.flush()
}
