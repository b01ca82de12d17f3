//! Interactive decisions for conflicts and destructive actions.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::anyhow;

use crate::client::{CliError, CliResult};

/// One answer the user may give.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Choice<T> {
    pub(crate) key: &'static str,
    pub(crate) label: &'static str,
    pub(crate) value: T,
}

/// Use the flag value when present, otherwise ask on the terminal.
///
/// Non-interactive runs without the flag are rejected rather than guessed.
pub(crate) fn decide<T: Copy>(
    flag: Option<T>,
    flag_hint: &str,
    question: &str,
    choices: &[Choice<T>],
) -> CliResult<T> {
    if let Some(value) = flag {
        return Ok(value);
    }
    if !io::stdin().is_terminal() {
        return Err(CliError::validation(format!(
            "{question} requires a decision; pass {flag_hint} when running non-interactively"
        )));
    }
    let stdin = io::stdin();
    let mut stderr = io::stderr();
    ask(&mut stdin.lock(), &mut stderr, question, choices)
}

/// Ask until one of `choices` is given. Answers match a key or a label.
pub(crate) fn ask<T: Copy, R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    choices: &[Choice<T>],
) -> CliResult<T> {
    let menu = choices
        .iter()
        .map(|choice| format!("[{}] {}", choice.key, choice.label))
        .collect::<Vec<_>>()
        .join("  ");

    loop {
        write!(output, "{question}\n  {menu}\n> ")
            .and_then(|()| output.flush())
            .map_err(|err| CliError::failure(anyhow!("failed to write prompt: {err}")))?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|err| CliError::failure(anyhow!("failed to read answer: {err}")))?;
        if read == 0 {
            return Err(CliError::validation("no answer given"));
        }

        let answer = line.trim();
        if let Some(choice) = choices.iter().find(|choice| {
            answer.eq_ignore_ascii_case(choice.key) || answer.eq_ignore_ascii_case(choice.label)
        }) {
            return Ok(choice.value);
        }
        writeln!(output, "unrecognised answer '{answer}'")
            .map_err(|err| CliError::failure(anyhow!("failed to write prompt: {err}")))?;
    }
}
