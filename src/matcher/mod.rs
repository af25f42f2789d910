mod cidr;

pub use cidr::CidrMatcher;
