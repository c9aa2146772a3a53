//! Common test helpers for ALICE-PRT integration tests
//!
//! Author: Moroya Sakamoto

use alice_prt::prelude::*;

// ============================================================================
// Standard test signals
// ============================================================================

/// Uniform single-color signal
#[allow(dead_code)]
pub fn uniform_signal(resolution: usize, color: Vec3) -> RadianceMap {
    RadianceMap::uniform(resolution, color).unwrap()
}

/// Red/green checkerboard at texel granularity
#[allow(dead_code)]
pub fn checkerboard_signal(resolution: usize) -> RadianceMap {
    let texels = (0..resolution * resolution)
        .map(|i| {
            let x = i % resolution;
            let y = i / resolution;
            if (x + y) % 2 == 0 {
                Vec3::new(1.0, 0.0, 0.0)
            } else {
                Vec3::new(0.0, 1.0, 0.0)
            }
        })
        .collect();
    RadianceMap::from_texels(texels, resolution).unwrap()
}

/// Smooth two-axis gradient with a constant blue floor
#[allow(dead_code)]
pub fn gradient_signal(resolution: usize) -> RadianceMap {
    let scale = 1.0 / resolution as f32;
    let texels = (0..resolution * resolution)
        .map(|i| {
            let x = i % resolution;
            let y = i / resolution;
            Vec3::new(x as f32 * scale, y as f32 * scale, 0.25)
        })
        .collect();
    RadianceMap::from_texels(texels, resolution).unwrap()
}

/// Deterministic pseudo-random signal (LCG; no external RNG needed)
#[allow(dead_code)]
pub fn noise_signal(resolution: usize, seed: u32) -> RadianceMap {
    let mut state = seed.wrapping_mul(2654435761).max(1);
    let mut next = move || {
        state = state.wrapping_mul(1664525).wrapping_add(1013904223);
        (state >> 8) as f32 / (1u32 << 24) as f32
    };
    let texels = (0..resolution * resolution)
        .map(|_| Vec3::new(next(), next(), next()))
        .collect();
    RadianceMap::from_texels(texels, resolution).unwrap()
}

// ============================================================================
// Assertion helpers
// ============================================================================

/// Assert two colors are close within tolerance
#[allow(dead_code)]
pub fn assert_color_close(a: Vec3, b: Vec3, tol: f32, msg: &str) {
    assert!(
        (a - b).abs().max_element() < tol,
        "{}: {:?} vs {:?} (tol={})",
        msg,
        a,
        b,
        tol
    );
}

/// Assert two maps match texel-for-texel within tolerance
#[allow(dead_code)]
pub fn assert_maps_close(a: &RadianceMap, b: &RadianceMap, tol: f32, msg: &str) {
    assert_eq!(a.resolution(), b.resolution(), "{}: resolution mismatch", msg);
    for (i, (x, y)) in a.texels().iter().zip(b.texels().iter()).enumerate() {
        assert!(
            (*x - *y).abs().max_element() < tol,
            "{}: texel {} differs: {:?} vs {:?}",
            msg,
            i,
            x,
            y
        );
    }
}
