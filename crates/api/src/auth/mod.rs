//! Access-token handling. Tokens are issued by the club's login service;
//! this server only validates them.

pub mod jwt;
