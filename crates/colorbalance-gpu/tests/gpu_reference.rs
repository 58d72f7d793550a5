//! GPU integration tests. Requires a real wgpu adapter; each test returns
//! early with a message when none is available.
//!
//! Run with: `cargo test -p colorbalance-gpu`

use std::sync::{Mutex, OnceLock};

use colorbalance_core::{
    ColorBalanceParams, CpuBackend, Mode, RegionLayout, derive, process_region,
};
use colorbalance_gpu::GpuGradingPipeline;

/// GPU and scalar use different pow/cbrt implementations.
const LAB_TOLERANCE: f32 = 2e-2;

fn gpu_test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn create_pipeline() -> Option<GpuGradingPipeline> {
    match GpuGradingPipeline::create_blocking() {
        Ok(pipeline) => Some(pipeline),
        Err(e) => {
            eprintln!("Skipping GPU test: {e}");
            None
        }
    }
}

fn gradient(layout: RegionLayout) -> Vec<[f32; 4]> {
    (0..layout.pixel_len())
        .map(|i| {
            let x = (i % layout.row_stride as usize) as f32;
            let y = (i / layout.row_stride as usize) as f32;
            [
                20.0 + 3.0 * x,
                -15.0 + 2.0 * y,
                10.0 - 1.5 * x,
                (x + y) / 100.0,
            ]
        })
        .collect()
}

fn graded(mode: Mode) -> ColorBalanceParams {
    let mut p = ColorBalanceParams::with_mode(mode);
    p.lift = [1.05, 0.97, 1.0, 1.04];
    p.gamma = [0.9, 1.05, 1.0, 0.95];
    p.gain = [1.15, 1.0, 0.95, 1.05];
    if mode != Mode::LegacySrgb {
        p.saturation = 1.2;
        p.contrast = 1.1;
    }
    p
}

#[test]
fn test_gpu_matches_scalar_for_every_mode() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(pipeline) = create_pipeline() else {
        return;
    };

    let layout = RegionLayout::packed(19, 7);
    let input = gradient(layout);
    for mode in [Mode::LegacySrgb, Mode::LiftGammaGainWide, Mode::SlopeOffsetPowerWide] {
        let coeffs = derive(&graded(mode));
        let mut cpu = vec![[0.0; 4]; input.len()];
        process_region(CpuBackend::Scalar, &coeffs, layout, &input, &mut cpu).unwrap();
        let mut gpu = vec![[0.0; 4]; input.len()];
        pipeline.grade(&coeffs, layout, &input, &mut gpu).unwrap();

        for (i, (c, g)) in cpu.iter().zip(&gpu).enumerate() {
            for ch in 0..3 {
                assert!(
                    (c[ch] - g[ch]).abs() < LAB_TOLERANCE,
                    "{mode:?} pixel {i} channel {ch}: cpu {:.5} gpu {:.5}",
                    c[ch],
                    g[ch]
                );
            }
            assert_eq!(c[3], g[3], "{mode:?} pixel {i} passthrough");
        }
    }
}

#[test]
fn test_gpu_matches_scalar_at_zero_gamma_and_contrast() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(pipeline) = create_pipeline() else {
        return;
    };

    // Neutral pixels well clear of the 1e6-exponent switch points, so both
    // sides land on the same side of the ceiling.
    let input: Vec<[f32; 4]> = [10.0, 25.0, 80.0, 95.0]
        .into_iter()
        .map(|l| [l, 0.0, 0.0, l / 100.0])
        .collect();
    let layout = RegionLayout::packed(input.len() as u32, 1);

    for mode in [Mode::LegacySrgb, Mode::LiftGammaGainWide, Mode::SlopeOffsetPowerWide] {
        let mut zero_gamma = ColorBalanceParams::with_mode(mode);
        zero_gamma.gamma[0] = 0.0;
        zero_gamma.gain[0] = 1.2;
        let mut zero_contrast = ColorBalanceParams::with_mode(mode);
        zero_contrast.contrast = 0.0;
        zero_contrast.gain[0] = 1.2;

        for (what, params) in [("gamma", zero_gamma), ("contrast", zero_contrast)] {
            let coeffs = derive(&params);
            let mut cpu = vec![[0.0; 4]; input.len()];
            process_region(CpuBackend::Scalar, &coeffs, layout, &input, &mut cpu).unwrap();
            let mut gpu = vec![[0.0; 4]; input.len()];
            pipeline.grade(&coeffs, layout, &input, &mut gpu).unwrap();

            for (i, (c, g)) in cpu.iter().zip(&gpu).enumerate() {
                assert!(
                    g.iter().all(|v| v.is_finite()),
                    "{mode:?} zero {what} pixel {i}: gpu {g:?}"
                );
                for ch in 0..3 {
                    let tol = LAB_TOLERANCE * c[ch].abs().max(1.0);
                    assert!(
                        (c[ch] - g[ch]).abs() < tol,
                        "{mode:?} zero {what} pixel {i} channel {ch}: cpu {:.5} gpu {:.5}",
                        c[ch],
                        g[ch]
                    );
                }
            }
        }
    }
}

#[test]
fn test_gpu_copies_stride_padding() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(pipeline) = create_pipeline() else {
        return;
    };

    let layout = RegionLayout {
        width: 5,
        height: 3,
        row_stride: 8,
    };
    let input = gradient(layout);
    let coeffs = derive(&graded(Mode::SlopeOffsetPowerWide));
    let mut output = vec![[0.0; 4]; input.len()];
    pipeline.grade(&coeffs, layout, &input, &mut output).unwrap();
    for row in 0..3 {
        for x in 5..8 {
            let i = row * 8 + x;
            assert_eq!(output[i], input[i], "padding pixel {i}");
        }
    }
}

#[test]
fn test_gpu_rejects_mismatched_buffers() {
    let _lock = gpu_test_lock().lock().expect("gpu test lock poisoned");
    let Some(pipeline) = create_pipeline() else {
        return;
    };

    let layout = RegionLayout::packed(4, 4);
    let input = vec![[50.0, 0.0, 0.0, 1.0]; 16];
    let mut output = vec![[-1.0; 4]; 8];
    let coeffs = derive(&ColorBalanceParams::default());
    assert!(pipeline.grade(&coeffs, layout, &input, &mut output).is_err());
    assert!(output.iter().all(|p| *p == [-1.0; 4]));
}
