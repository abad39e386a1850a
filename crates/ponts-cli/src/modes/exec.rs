//! Single-shot exec mode.
//!
//! Output contract:
//! - visible answer text → stdout, streamed as it settles
//! - reasoning → stderr with `--show-reasoning`, otherwise dropped
//! - errors and the interrupt notice → stderr

use std::io::{self, Write, stderr, stdout};

use anyhow::{Context, Result};
use ponts_core::config::Config;
use ponts_core::core::engine::spawn_chat_stream;
use ponts_core::core::events::create_event_channel;
use ponts_core::core::interrupt::{self, InterruptedError};
use ponts_core::core::session::{ChatSession, TurnStatus};
use ponts_core::providers::{OllamaClient, OllamaConfig};
use ponts_core::segment;

#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    pub show_reasoning: bool,
}

/// Streams the answer to `prompt` and returns the visible text.
///
/// Ctrl+C stops generation, keeps what was printed and returns
/// `InterruptedError`.
pub async fn run_exec(
    prompt: &str,
    config: &Config,
    system_prompt: String,
    options: &ExecOptions,
) -> Result<String> {
    let client = OllamaClient::new(OllamaConfig::from_config(config));
    let mut session = ChatSession::new(system_prompt);
    let Some(request) = session.submit(prompt) else {
        anyhow::bail!("Prompt is empty");
    };
    let turn = request.turn;
    tracing::info!(model = client.model(), endpoint = %client.endpoint(), "Sending prompt");

    let (tx, mut rx) = create_event_channel();
    let handle = spawn_chat_stream(client, request, tx);
    let mut printer = SegmentPrinter::new(stdout(), stderr(), options.show_reasoning);

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                if !session.apply(event) {
                    continue;
                }
                let written = match session.turn(turn) {
                    Some(t) => printer.update(&t.text, !t.is_streaming()),
                    None => Ok(()),
                };
                if let Err(err) = written {
                    // Reader went away (e.g. `| head -1`): stop generating.
                    session.cancel();
                    let _ = handle.await;
                    return Err(err).context("write output");
                }
            }
            () = interrupt::wait_for_interrupt(), if session.is_streaming() => {
                session.cancel();
            }
        }
    }
    let _ = handle.await;

    let Some(t) = session.turn(turn) else {
        anyhow::bail!("assistant turn missing");
    };
    printer.update(&t.text, true).context("write output")?;
    printer.finish().context("write output")?;

    match &t.status {
        TurnStatus::Complete | TurnStatus::Streaming => Ok(segment::parse(&t.text).visible_text()),
        TurnStatus::Cancelled => {
            let _ = writeln!(stderr(), "\n^C Interrupted.");
            Err(InterruptedError.into())
        }
        TurnStatus::Failed { message } => anyhow::bail!("{message}"),
    }
}

/// Writes a growing turn text as two incremental streams.
///
/// Only the settled prefix is considered while streaming, so a marker split
/// across tokens (`"<thi"` + `"nk>"`) is never printed and then retracted.
pub struct SegmentPrinter<O: Write, E: Write> {
    out: O,
    err: E,
    show_reasoning: bool,
    /// Bytes of (leading-trimmed) visible text already written.
    visible_written: usize,
    reasoning_written: usize,
}

impl<O: Write, E: Write> SegmentPrinter<O, E> {
    pub fn new(out: O, err: E, show_reasoning: bool) -> Self {
        Self {
            out,
            err,
            show_reasoning,
            visible_written: 0,
            reasoning_written: 0,
        }
    }

    /// Prints whatever `text` adds beyond what was already printed.
    /// `done` releases a held-back trailing partial marker.
    ///
    /// # Errors
    /// Returns the first write error, e.g. `BrokenPipe` once the reader is
    /// gone.
    pub fn update(&mut self, text: &str, done: bool) -> io::Result<()> {
        let settled = if done {
            text
        } else {
            segment::settled_prefix(text)
        };
        let parsed = segment::parse(settled);

        let visible = parsed.visible_text();
        let visible = visible.trim_start();
        if let Some(delta) = visible.get(self.visible_written..)
            && !delta.is_empty()
        {
            self.out.write_all(delta.as_bytes())?;
            self.out.flush()?;
            self.visible_written = visible.len();
        }

        if self.show_reasoning {
            let reasoning = parsed.reasoning_text();
            if let Some(delta) = reasoning.get(self.reasoning_written..)
                && !delta.is_empty()
            {
                self.err.write_all(delta.as_bytes())?;
                self.err.flush()?;
                self.reasoning_written = reasoning.len();
            }
        }
        Ok(())
    }

    /// Terminates both streams with a newline if anything was written.
    ///
    /// # Errors
    /// Returns the first write error.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.visible_written > 0 {
            writeln!(self.out)?;
            self.out.flush()?;
        }
        if self.reasoning_written > 0 {
            writeln!(self.err)?;
            self.err.flush()?;
        }
        Ok(())
    }

    #[cfg(test)]
    fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }
}
