/// What the binary was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Print the number of stored readings and exit.
    Count,
    /// Collect forever.
    Run,
}

impl Command {
    /// Only a lone `count` argument selects [`Command::Count`]; every other
    /// argument form runs the loop.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<S> = args.into_iter().collect();
        match args.as_slice() {
            [only] if only.as_ref() == "count" => Command::Count,
            _ => Command::Run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_count_argument_counts() {
        assert_eq!(Command::from_args(["count"]), Command::Count);
    }

    #[test]
    fn everything_else_runs() {
        assert_eq!(Command::from_args(Vec::<String>::new()), Command::Run);
        assert_eq!(Command::from_args(["count", "extra"]), Command::Run);
        assert_eq!(Command::from_args(["COUNT"]), Command::Run);
        assert_eq!(Command::from_args(["run"]), Command::Run);
    }
}
