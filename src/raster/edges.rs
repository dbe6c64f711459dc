use image::{GrayImage, RgbImage};
use imageproc::edges::canny;

/// Pixel coordinate `(x, y)` of an embedding site.
pub type Site = (u32, u32);

/// Canny edge sites of one channel, in row-major scan order.
///
/// The order is the embedding order, so encoder and decoder must call this on
/// images whose `channel` plane is identical.
///
/// `imageproc`'s Canny smooths the plane with a Gaussian before taking
/// gradients. Detectors that skip that step (OpenCV's `Canny`, for one) find
/// different sites, so images embedded with them do not decode here.
pub fn edge_sites(image: &RgbImage, channel: usize, low: f32, high: f32) -> Vec<Site> {
    let plane = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        image::Luma([image.get_pixel(x, y)[channel]])
    });
    let edges = canny(&plane, low, high);

    // enumerate_pixels walks rows top to bottom, left to right
    edges
        .enumerate_pixels()
        .filter(|(_, _, p)| p[0] > 0)
        .map(|(x, y, _)| (x, y))
        .collect()
}
