#![allow(dead_code)]

pub mod rsa {
    pub const PRIMARY_KEY_ID: &str = "barista-primary";
    pub const ROTATED_KEY_ID: &str = "barista-rotated";

    pub const PRIMARY_JWK: &str = include_str!("../data/rsa/primary-jwk.json");
    pub const ROTATED_JWK: &str = include_str!("../data/rsa/rotated-jwk.json");
    pub const JWKS: &str = include_str!("../data/rsa/jwks.json");

    #[cfg(feature = "private-keys")]
    pub const PRIMARY_PKCS8: &[u8] = include_bytes!("../data/rsa/primary-pkcs8.der");
    #[cfg(feature = "private-keys")]
    pub const ROTATED_PKCS8: &[u8] = include_bytes!("../data/rsa/rotated-pkcs8.der");
}
