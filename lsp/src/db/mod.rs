pub mod opening_fee_params_settings;
