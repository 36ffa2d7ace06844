//! Text status enums mapping to `CHECK`-constrained TEXT columns.

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $val)] $variant ),+
        }

        impl $name {
            /// Return the stored column value.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }

            /// Parse a stored column value.
            pub fn parse(value: &str) -> Option<Self> {
                match value {
                    $( $val => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_status_enum! {
    /// Outcome recorded on a `messages` audit row. Fixed at insert.
    MessageStatus {
        Queued = "QUEUED",
        Sent = "SENT",
        Failed = "FAILED",
    }
}

define_status_enum! {
    MessageDirection {
        Inbound = "INBOUND",
        Outbound = "OUTBOUND",
    }
}

define_status_enum! {
    /// Delivery outcome of an `email_logs` row.
    EmailStatus {
        Pending = "PENDING",
        Sent = "SENT",
        Failed = "FAILED",
    }
}

define_status_enum! {
    /// Lifecycle of an `email_queue` item. Advanced by the external consumer.
    QueueStatus {
        Pending = "PENDING",
        Running = "RUNNING",
        Completed = "COMPLETED",
        Failed = "FAILED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_str_and_parse_agree() {
        for s in [EmailStatus::Pending, EmailStatus::Sent, EmailStatus::Failed] {
            assert_eq!(EmailStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(QueueStatus::parse("DONE"), None);
    }

    #[test]
    fn serde_uses_column_values() {
        assert_eq!(
            serde_json::to_string(&MessageStatus::Failed).unwrap(),
            "\"FAILED\""
        );
        assert_eq!(MessageDirection::Outbound.to_string(), "OUTBOUND");
    }
}
