// Builds obstacle masks from PNG images or the built-in channel layout

use image::{GenericImageView, ImageReader, Pixel};
use std::path::Path;

use crate::{
    error::{InputError, SimResult},
    sim::field::{Grid, ObstacleMask},
};

const THRESHOLD_LUMA: u8 = 127;

/// Load an obstacle mask from a PNG image by looking at pixel luminosity.
/// Dark pixels (luma below 127) become obstacles.
///
/// Parameters
/// - `image` - The path to the image to process
///
/// Returns
/// - The mask, one cell per pixel, as a Result
pub fn mask_from_image(image: &Path) -> Result<ObstacleMask, InputError> {
    let image = ImageReader::open(image)?.decode()?;

    let (nrows, ncols) = (image.height() as usize, image.width() as usize);
    let grid = Grid::new(ncols, nrows)?;

    let mut fixed = vec![false; grid.len()];

    // load mask
    image.pixels().for_each(|(x, y, color)| {
        fixed[grid.index(y as usize, x as usize)] = color.to_luma().0[0] < THRESHOLD_LUMA
    });

    Ok(ObstacleMask::from_flags(grid, fixed)?)
}

/// A walled channel with a square block in the middle.
///
/// The block reaches a twentieth of the shorter side out from the centre cell
/// in each direction, inclusive, so a 200x200 channel gets rows and columns
/// 90 through 110.
///
/// Parameters
/// - `width` - The number of columns
/// - `height` - The number of rows
pub fn channel_mask(width: usize, height: usize) -> SimResult<ObstacleMask> {
    let grid = Grid::new(width, height)?;
    let mut mask = ObstacleMask::with_walls(grid);

    let half = width.min(height) / 20;
    let (row, col) = (height / 2, width / 2);

    mask.fill_rect(row - half..row + half + 1, col - half..col + half + 1);

    Ok(mask)
}
