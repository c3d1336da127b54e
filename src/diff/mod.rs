pub mod bitmap;
pub mod differ;
pub mod regions;
pub mod ssim;
