mod opening_fee_params;
mod promise;

pub use opening_fee_params::*;
pub use promise::*;
