use crate::error::PlotError;
use crate::ir::ColorMap;

use super::SubCellPosition;

/// Pip offsets inside a unit cell, indexed by the number of tertiary values.
const FACES: [&[(f64, f64)]; 6] = [
    &[(0.0, 0.0)],
    &[(-0.2, 0.0), (0.2, 0.0)],
    &[(0.0, 0.0), (-0.2, 0.2), (0.2, -0.2)],
    &[(-0.2, 0.2), (0.2, 0.2), (-0.2, -0.2), (0.2, -0.2)],
    &[(0.0, 0.0), (-0.2, 0.2), (0.2, 0.2), (-0.2, -0.2), (0.2, -0.2)],
    &[
        (-0.2, 0.2),
        (0.2, 0.2),
        (-0.2, 0.0),
        (0.2, 0.0),
        (-0.2, -0.2),
        (0.2, -0.2),
    ],
];

pub fn face_offsets(count: usize) -> Result<&'static [(f64, f64)], PlotError> {
    if (1..=FACES.len()).contains(&count) {
        Ok(FACES[count - 1])
    } else {
        Err(PlotError::UnsupportedCardinality { count })
    }
}

/// Maps each tertiary value, in color-map key order, to its pip offset.
pub fn assign_positions(
    colors: &ColorMap,
    max_sides: usize,
) -> Result<Vec<(String, SubCellPosition)>, PlotError> {
    let count = colors.len();
    if count > max_sides && count <= FACES.len() {
        return Err(PlotError::TooManyDiceSides {
            count,
            max: max_sides,
        });
    }
    let offsets = face_offsets(count)?;
    Ok(colors
        .keys()
        .zip(offsets)
        .map(|(value, &(x_offset, y_offset))| (value.to_string(), SubCellPosition { x_offset, y_offset }))
        .collect())
}
