mod isolate;
mod source;
mod value;

pub use isolate::{preflight_secrets, SecretBundle};
pub use source::{EnvSecrets, SecretSource, SecretSourceError, StaticSecrets};
pub use value::SecretValue;
