//! Interactive prompts
//!
//! Reads answers from any `BufRead` and writes questions to any `Write`, so the
//! interactive flows can be driven from tests. With `assume_yes` set, nothing
//! is read: confirmations succeed and free-text questions take their default.

use std::io::{self, BufRead, Write};

pub struct Prompter<R, W> {
    input: R,
    output: W,
    assume_yes: bool,
}

impl Prompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter over the process's stdin/stdout.
    pub fn stdio(assume_yes: bool) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), assume_yes)
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W, assume_yes: bool) -> Self {
        Self {
            input,
            output,
            assume_yes,
        }
    }

    pub fn assume_yes(&self) -> bool {
        self.assume_yes
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask a yes/no question. Only `y`/`yes` (any case) counts as yes;
    /// end of input counts as no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        if self.assume_yes {
            writeln!(self.output, "{} (y/n): y", question)?;
            return Ok(true);
        }

        write!(self.output, "{} (y/n): ", question)?;
        self.output.flush()?;
        Ok(matches!(
            self.read_line()?.map(|a| a.to_lowercase()).as_deref(),
            Some("y") | Some("yes")
        ))
    }

    /// Ask for free text; an empty answer or end of input yields `default`.
    pub fn ask(&mut self, question: &str, default: &str) -> io::Result<String> {
        if self.assume_yes {
            writeln!(self.output, "{} [{}]: {}", question, default, default)?;
            return Ok(default.to_string());
        }

        write!(self.output, "{} [{}]: ", question, default)?;
        self.output.flush()?;
        Ok(match self.read_line()? {
            Some(answer) if !answer.is_empty() => answer,
            _ => default.to_string(),
        })
    }

    /// Wait for the user to press Enter.
    pub fn pause(&mut self, message: &str) -> io::Result<()> {
        if self.assume_yes {
            return Ok(());
        }
        write!(self.output, "{}", message)?;
        self.output.flush()?;
        self.read_line()?;
        Ok(())
    }
}
