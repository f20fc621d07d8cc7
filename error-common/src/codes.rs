// Stable reason codes for verification verdicts.
// Codes are part of the external contract: never renumber, only append.

pub mod decode {
    pub const MALFORMED_INPUT: &str = "DECODE_1001";
    pub const UNSUPPORTED_ALGORITHM: &str = "DECODE_1002";
}

pub mod chain {
    pub const NO_PATH_FOUND: &str = "CHAIN_2001";
    pub const EXPIRED_CERTIFICATE: &str = "CHAIN_2002";
    pub const SIGNATURE_MISMATCH: &str = "CHAIN_2003";
    pub const CONSTRAINT_VIOLATION: &str = "CHAIN_2004";
    pub const CYCLE_DETECTED: &str = "CHAIN_2005";
    pub const REVOKED: &str = "CHAIN_2006";
}

pub mod token {
    pub const ALGORITHM_MISMATCH: &str = "TOKEN_3001";
    pub const EXPIRED: &str = "TOKEN_3002";
    pub const NOT_YET_VALID: &str = "TOKEN_3003";
    pub const ISSUER_MISMATCH: &str = "TOKEN_3004";
    pub const BAD_SIGNATURE: &str = "TOKEN_3005";
    pub const AUDIENCE_MISMATCH: &str = "TOKEN_3006";
    pub const MISSING_CLAIM: &str = "TOKEN_3007";
    pub const INVALID_TYPE: &str = "TOKEN_3008";
}

pub mod service {
    pub const KEY_NOT_FOUND: &str = "SERVICE_4001";
    pub const INVALID_ARGUMENT: &str = "SERVICE_4002";
    pub const RESOURCE_EXHAUSTED: &str = "SERVICE_4003";
    pub const CONFIGURATION: &str = "SERVICE_4004";
    pub const DEADLINE_EXCEEDED: &str = "SERVICE_4005";
    pub const INTERNAL: &str = "SERVICE_4006";
}
