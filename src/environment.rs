//! Runtime detection and well-known environment variable names.

use std::env;
use std::fmt;

/// Set by Function Compute for every account.
pub const FC_ACCOUNT_ID: &str = "FC_ACCOUNT_ID";

/// Set by Function Compute for every function instance.
pub const FC_INSTANCE_ID: &str = "FC_INSTANCE_ID";

/// Names the RAM role used when the caller does not pass one.
pub const DEFAULT_ROLE_VAR: &str = "ECS_RAM_NAME";

/// Access key ID read by the Alibaba Cloud SDK default credential chain.
pub const ACCESS_KEY_ID_VAR: &str = "ALIBABA_CLOUD_ACCESS_KEY_ID";

/// Access key secret read by the Alibaba Cloud SDK default credential chain.
pub const ACCESS_KEY_SECRET_VAR: &str = "ALIBABA_CLOUD_ACCESS_KEY_SECRET";

/// Security token read by the Alibaba Cloud SDK default credential chain.
pub const SECURITY_TOKEN_VAR: &str = "ALIBABA_CLOUD_SECURITY_TOKEN";

/// Where the process is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Runtime {
    /// An ECS instance (or anything else that is not Function Compute).
    Ecs,
    /// Function Compute, which injects credentials on its own.
    FunctionCompute,
}

impl Runtime {
    /// Detect the runtime from the process environment.
    pub fn detect() -> Self {
        let marked = |name: &str| env::var_os(name).is_some_and(|v| !v.is_empty());
        if marked(FC_ACCOUNT_ID) || marked(FC_INSTANCE_ID) {
            Runtime::FunctionCompute
        } else {
            Runtime::Ecs
        }
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Runtime::Ecs => write!(f, "ECS"),
            Runtime::FunctionCompute => write!(f, "Function Compute"),
        }
    }
}

/// The default RAM role name, empty when `ECS_RAM_NAME` is unset.
pub fn default_role() -> String {
    env::var(DEFAULT_ROLE_VAR).unwrap_or_default()
}
