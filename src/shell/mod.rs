//! Interactive command loop over a `PmrStack<i32>`
//!
//! Commands are whitespace-separated tokens: `push <int>`, `pop`, `top`,
//! `all`, `clear`, `exit`. Failures are reported as messages and the loop
//! keeps going; only I/O errors end it early.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use tracing::debug;

use crate::allocator::MemoryResource;
use crate::errors::StackError;
use crate::stack::PmrStack;

/// Command names in the order they are listed at startup
pub const COMMANDS: [&str; 6] = ["push", "pop", "top", "all", "clear", "exit"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Push,
    Pop,
    Top,
    All,
    Clear,
    Exit,
    Unknown(String),
}

impl Command {
    pub fn parse(token: &str) -> Self {
        match token {
            "push" => Self::Push,
            "pop" => Self::Pop,
            "top" => Self::Top,
            "all" => Self::All,
            "clear" => Self::Clear,
            "exit" => Self::Exit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Whitespace tokenizer that pulls lines from `R` on demand
struct Tokens<R> {
    input: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> Tokens<R> {
    fn new(input: R) -> Self {
        Self {
            input,
            pending: VecDeque::new(),
        }
    }

    /// Next token, or `None` at end of input
    fn next_token(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(Some(token));
            }
            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_string));
        }
    }

    /// Drop whatever is left of the current line
    fn discard_line(&mut self) {
        self.pending.clear();
    }
}

/// Command loop writing results to `out` and diagnostics to `err`
pub struct Shell<'r, O: Write, E: Write> {
    stack: PmrStack<'r, i32, dyn MemoryResource + 'r>,
    out: O,
    err: E,
}

impl<'r, O: Write, E: Write> Shell<'r, O, E> {
    pub fn new(resource: &'r (dyn MemoryResource + 'r), out: O, err: E) -> Self {
        Self {
            stack: PmrStack::new(resource),
            out,
            err,
        }
    }

    pub fn stack(&self) -> &PmrStack<'r, i32, dyn MemoryResource + 'r> {
        &self.stack
    }

    /// Print the command list, then execute commands until `exit` or end of input
    pub fn run<R: BufRead>(&mut self, input: R) -> io::Result<()> {
        self.print_help()?;
        let mut tokens = Tokens::new(input);

        loop {
            write!(self.out, "\n> ")?;
            self.out.flush()?;

            let Some(token) = tokens.next_token()? else {
                break;
            };
            let command = Command::parse(&token);
            debug!(target: "pmr_stack::shell", ?command, "dispatch");

            match command {
                Command::Exit => break,
                Command::Push => self.push(&mut tokens)?,
                Command::Pop => self.pop()?,
                Command::Top => self.top()?,
                Command::All => self.all()?,
                Command::Clear => {
                    self.stack.clear();
                    writeln!(self.out, "stack cleared")?;
                }
                Command::Unknown(_) => writeln!(self.out, "ERROR")?,
            }
        }

        Ok(())
    }

    fn print_help(&mut self) -> io::Result<()> {
        for name in COMMANDS {
            writeln!(self.out, "{}", name)?;
        }
        Ok(())
    }

    fn push<R: BufRead>(&mut self, tokens: &mut Tokens<R>) -> io::Result<()> {
        let value = match tokens.next_token()? {
            Some(token) => token.parse::<i32>().ok(),
            None => None,
        };
        let Some(value) = value else {
            tokens.discard_line();
            return writeln!(self.err, "ERROR - invalid number input");
        };

        match self.stack.push(value) {
            Ok(()) => Ok(()),
            Err(StackError::OutOfMemory(_)) => writeln!(self.err, "ERROR - not enough memory"),
            Err(e) => writeln!(self.err, "ERROR - {}", e),
        }
    }

    fn pop(&mut self) -> io::Result<()> {
        if self.stack.is_empty() {
            return writeln!(self.out, "stack is empty");
        }
        self.stack.pop();
        Ok(())
    }

    fn top(&mut self) -> io::Result<()> {
        match self.stack.top() {
            Ok(value) => writeln!(self.out, "top element:{}", value),
            Err(_) => writeln!(self.out, "stack is empty."),
        }
    }

    fn all(&mut self) -> io::Result<()> {
        if self.stack.is_empty() {
            return writeln!(self.out, "stack is empty");
        }
        write!(self.out, "stack content:")?;
        for value in &self.stack {
            write!(self.out, "{} ", value)?;
        }
        writeln!(self.out)
    }
}
