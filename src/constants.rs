//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// API group of every QubeSec custom resource
pub const API_GROUP: &str = "qubesec.io";

/// Field manager name used for status patches
pub const FIELD_MANAGER: &str = "qubesec-controller";

/// Label carried by every output Secret; the owned-Secret watches select on it
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default number of reconciliations a single controller runs in parallel
pub const DEFAULT_RECONCILE_CONCURRENCY: u16 = 4;

/// Default periodic resync interval after a successful reconciliation (seconds)
pub const DEFAULT_RESYNC_INTERVAL_SECS: u64 = 300;

/// Default requeue interval while a referenced producer is not yet ready (seconds)
pub const DEFAULT_PENDING_REQUEUE_SECS: u64 = 10;

/// Default requeue interval after losing a status write race (seconds)
pub const DEFAULT_CONFLICT_REQUEUE_SECS: u64 = 5;

/// Default Fibonacci backoff lower bound (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;

/// Default Fibonacci backoff upper bound (minutes)
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default number of read-modify-write attempts for a status update
pub const DEFAULT_STATUS_WRITE_ATTEMPTS: u32 = 3;

/// Default delay before restarting a controller stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Output storage name suffixes, appended to the requesting resource's name
pub const KEYPAIR_SUFFIX: &str = "keypair";
pub const SHARED_SECRET_SUFFIX: &str = "shared-secret";
pub const DERIVED_KEY_SUFFIX: &str = "derived-key";
pub const SIGNATURE_SUFFIX: &str = "signature";
pub const RANDOM_NUMBER_SUFFIX: &str = "random";
pub const CERTIFICATE_SUFFIX: &str = "certificate";

/// Output storage data keys
pub const PUBLIC_KEY_FIELD: &str = "public-key";
pub const PRIVATE_KEY_FIELD: &str = "private-key";
pub const SHARED_SECRET_FIELD: &str = "shared-secret";
pub const CIPHERTEXT_FIELD: &str = "ciphertext";
pub const DERIVED_KEY_FIELD: &str = "derived-key";
pub const FINGERPRINT_FIELD: &str = "fingerprint";
pub const KEY_TYPE_FIELD: &str = "key-type";
pub const RANDOM_NUMBER_FIELD: &str = "quantumrandomnumber";
pub const TLS_CERT_FIELD: &str = "tls.crt";
pub const TLS_KEY_FIELD: &str = "tls.key";

/// Default data key holding the message to sign or verify
pub const DEFAULT_MESSAGE_KEY: &str = "message";

/// Default data key holding a signature
pub const DEFAULT_SIGNATURE_KEY: &str = "signature";

/// Annotation on a signature Secret recording the fingerprint of the signed message
pub const MESSAGE_FINGERPRINT_ANNOTATION: &str = "qubesec.io/message-fingerprint";

/// Length of a display fingerprint (hex characters)
pub const FINGERPRINT_DISPLAY_LEN: usize = 10;

/// Derived key output length (bytes)
pub const DERIVED_KEY_LEN: usize = 32;

/// Maximum resource name length for QuantumRandomNumber (DNS-1035 label limit minus 11)
pub const MAX_RANDOM_NUMBER_NAME_LEN: usize = 52;

/// Minimum accepted seed length for QuantumRandomNumber (bytes)
pub const MIN_SEED_LEN: usize = 48;

/// Upper bound on bytes generated by one QuantumRandomNumber
pub const MAX_RANDOM_BYTES: usize = 65_536;

/// Default certificate lifetime (days)
pub const DEFAULT_CERTIFICATE_DAYS: u32 = 365;

/// Longest certificate lifetime accepted (days)
pub const MAX_CERTIFICATE_DAYS: u32 = 3650;

/// Timeout for downloading a QuantumRandomNumber seed (seconds)
pub const SEED_FETCH_TIMEOUT_SECS: u64 = 10;

/// Error text recorded when a signature does not verify
pub const SIGNATURE_INVALID_MESSAGE: &str = "signature verification failed";
