// Cube Module - Lattice dimensions and serpentine LED addressing
//
// The physical strip snakes through the cube one z-layer at a time. Even layers
// walk rows bottom to top, odd layers walk them top to bottom, and inside every
// row the x direction flips on odd rows.

/// Side length of the cube in LEDs
pub const CUBE_SIZE: usize = 8;

/// Total number of addressable LEDs
pub const NUM_LEDS: usize = CUBE_SIZE * CUBE_SIZE * CUBE_SIZE;

/// Geometric center of the lattice (between the two middle cells on each axis)
pub const CENTER: f64 = CUBE_SIZE as f64 / 2.0 - 0.5;

const N: i32 = CUBE_SIZE as i32;

/// True if the coordinate lies inside the lattice
pub fn in_bounds(x: i32, y: i32, z: i32) -> bool {
    (0..N).contains(&x) && (0..N).contains(&y) && (0..N).contains(&z)
}

/// Convert XYZ lattice coordinates to the LED strip index.
/// Out-of-range coordinates map to index 0, matching the firmware's overflow guard.
pub fn xyz_to_index(x: i32, y: i32, z: i32) -> usize {
    if !in_bounds(x, y, z) {
        return 0;
    }

    let mut index = z * N * N;

    if z % 2 == 0 {
        index += y * N;
        if y % 2 == 0 {
            index += x;
        } else {
            index += N - 1 - x;
        }
    } else {
        index += (N - 1 - y) * N;
        // x direction follows the original row parity, not the reversed one
        if (y + 1) % 2 == 0 {
            index += N - 1 - x;
        } else {
            index += x;
        }
    }

    index as usize
}

/// Convert an LED strip index back to XYZ lattice coordinates.
/// Out-of-range indices map to (0, 0, 0).
pub fn index_to_xyz(index: i32) -> (i32, i32, i32) {
    if index < 0 || index >= NUM_LEDS as i32 {
        return (0, 0, 0);
    }

    let z = index / (N * N);
    let within_layer = index % (N * N);
    let row = within_layer / N;
    let column = within_layer % N;

    let y = if z % 2 == 0 { row } else { N - 1 - row };
    let x = if y % 2 == 0 { column } else { N - 1 - column };

    (x, y, z)
}

/// Iterate over every LED as (index, x, y, z) in strip order
pub fn cells() -> impl Iterator<Item = (usize, i32, i32, i32)> {
    (0..NUM_LEDS).map(|i| {
        let (x, y, z) = index_to_xyz(i as i32);
        (i, x, y, z)
    })
}

/// Euclidean distance from a cell to the lattice center
pub fn distance_from_center(x: i32, y: i32, z: i32) -> f64 {
    let dx = x as f64 - CENTER;
    let dy = y as f64 - CENTER;
    let dz = z as f64 - CENTER;
    (dx * dx + dy * dy + dz * dz).sqrt()
}
