use clap::Parser;

/// Hold a distributed lock for as long as this process runs.
///
/// The lock is acquired at startup, readiness is reported to systemd, and the lock is
/// released when the process receives SIGINT or SIGTERM.
#[derive(Parser, Debug, PartialEq, Eq)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Key identifying the shared resource to lock
    #[arg(value_name = "KEY")]
    pub key: String,

    /// Owner name recorded on the lock; defaults to the EC2 instance id
    #[arg(value_name = "OWNER_NAME")]
    pub owner_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn key_is_required() {
        let err = Args::try_parse_from(["lock-keeper"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn owner_name_is_optional() {
        let args = Args::try_parse_from(["lock-keeper", "process-order-42"]).unwrap();
        assert_eq!(args.key, "process-order-42");
        assert_eq!(args.owner_name, None);

        let args = Args::try_parse_from(["lock-keeper", "process-order-42", "worker-1"]).unwrap();
        assert_eq!(args.owner_name.as_deref(), Some("worker-1"));
    }

    #[test]
    fn extra_arguments_are_rejected() {
        assert!(Args::try_parse_from(["lock-keeper", "a", "b", "c"]).is_err());
    }
}
