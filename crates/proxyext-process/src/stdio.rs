//! Standard I/O binding for external commands

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncWrite};

/// Borrowed async reader fed into a child's stdin
pub type Reader<'a> = &'a mut (dyn AsyncRead + Send + Unpin);

/// Borrowed async writer receiving a child's stdout or stderr
pub type Writer<'a> = &'a mut (dyn AsyncWrite + Send + Unpin);

/// Source of a child's standard input
#[derive(Default)]
pub enum Input<'a> {
    /// Share the host process's stdin
    #[default]
    Inherit,
    /// Attach `/dev/null`
    Null,
    /// Copy everything from the reader, then close the child's stdin
    Reader(Reader<'a>),
}

/// Destination of a child's standard output or error
#[derive(Default)]
pub enum Output<'a> {
    /// Share the host process's stream
    #[default]
    Inherit,
    /// Discard
    Null,
    /// Copy everything the child writes into the writer
    Writer(Writer<'a>),
}

impl Input<'_> {
    pub(crate) fn stdio(&self) -> Stdio {
        match self {
            Input::Inherit => Stdio::inherit(),
            Input::Null => Stdio::null(),
            Input::Reader(_) => Stdio::piped(),
        }
    }
}

impl Output<'_> {
    pub(crate) fn stdio(&self) -> Stdio {
        match self {
            Output::Inherit => Stdio::inherit(),
            Output::Null => Stdio::null(),
            Output::Writer(_) => Stdio::piped(),
        }
    }
}

/// The input/output/error triple bound to one external command invocation.
///
/// Readers and writers are borrowed for the duration of a single
/// [`ProcessRunner::run`](crate::ProcessRunner::run) call and released when it returns.
#[derive(Default)]
pub struct StdStreams<'a> {
    pub input: Input<'a>,
    pub output: Output<'a>,
    pub error: Output<'a>,
}

impl<'a> StdStreams<'a> {
    /// All three streams shared with the host process
    pub fn inherit() -> Self {
        Self::default()
    }

    /// All three streams attached to the null device
    pub fn null() -> Self {
        Self {
            input: Input::Null,
            output: Output::Null,
            error: Output::Null,
        }
    }

    /// Feed stdin from `reader`
    pub fn with_input<R>(mut self, reader: &'a mut R) -> Self
    where
        R: AsyncRead + Send + Unpin,
    {
        self.input = Input::Reader(reader);
        self
    }

    /// Capture stdout into `writer`
    pub fn with_output<W>(mut self, writer: &'a mut W) -> Self
    where
        W: AsyncWrite + Send + Unpin,
    {
        self.output = Output::Writer(writer);
        self
    }

    /// Capture stderr into `writer`
    pub fn with_error<W>(mut self, writer: &'a mut W) -> Self
    where
        W: AsyncWrite + Send + Unpin,
    {
        self.error = Output::Writer(writer);
        self
    }

    /// Split into the borrowed reader and writers that need pumping.
    pub(crate) fn pumps(&mut self) -> (Option<Reader<'_>>, Option<Writer<'_>>, Option<Writer<'_>>) {
        let input = match &mut self.input {
            Input::Reader(r) => Some(&mut **r as Reader<'_>),
            _ => None,
        };
        let output = match &mut self.output {
            Output::Writer(w) => Some(&mut **w as Writer<'_>),
            _ => None,
        };
        let error = match &mut self.error {
            Output::Writer(w) => Some(&mut **w as Writer<'_>),
            _ => None,
        };
        (input, output, error)
    }
}
