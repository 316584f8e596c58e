use anyhow::{anyhow, Context, Result};
use std::{io::BufRead, str::FromStr};

/// Line oriented reader for the contest formats: every line is a list of
/// whitespace separated integers. Errors name the offending line.
pub struct IntLines<R> {
    reader: R,
    line_no: usize,
    buffer: String,
}

impl<R: BufRead> IntLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_no: 0,
            buffer: String::new(),
        }
    }

    /// Number of lines consumed so far.
    pub fn line_no(&self) -> usize {
        self.line_no
    }

    pub fn next_line<T>(&mut self) -> Result<Vec<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.buffer.clear();
        let read = self
            .reader
            .read_line(&mut self.buffer)
            .with_context(|| format!("Failed to read line {}", self.line_no + 1))?;
        if read == 0 {
            return Err(anyhow!(
                "Unexpected end of input after line {}",
                self.line_no
            ));
        }
        self.line_no += 1;

        let line_no = self.line_no;
        self.buffer
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<T>()
                    .with_context(|| format!("Line {}: invalid integer '{}'", line_no, token))
            })
            .collect()
    }

    pub fn next_exact<T>(&mut self, count: usize) -> Result<Vec<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let values = self.next_line::<T>()?;
        if values.len() != count {
            return Err(anyhow!(
                "Line {}: expected {} values, found {}",
                self.line_no,
                count,
                values.len()
            ));
        }
        Ok(values)
    }

    pub fn next_array<T, const N: usize>(&mut self) -> Result<[T; N]>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let values = self.next_exact::<T>(N)?;
        values
            .try_into()
            .map_err(|_| anyhow!("Line {}: expected {} values", self.line_no, N))
    }
}
