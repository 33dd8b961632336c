pub mod fixed_product;

pub use fixed_product::marginal_prices;
