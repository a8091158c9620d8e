use anyhow::{Context, Result};
use std::path::PathBuf;
use vocalcore::dsp::default_model;
use vocalcore::pcm::{read_wav_file, subtract, write_wav_file};
use vocalcore::{classify_voice, AnalysisConfig, DenoiseOrchestrator, PitchTracker};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let input = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("test_data/vocal_take.wav"));
    let out_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    let config = match std::env::var("VOCALCORE_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config '{}'", path))?;
            AnalysisConfig::from_json(&json)?
        }
        Err(_) => AnalysisConfig::default(),
    };

    let take = read_wav_file(&input)?;
    println!("Analysis summary for '{}':", input.display());
    println!("  sample rate      : {} Hz", take.sample_rate);
    println!(
        "  duration         : {:.2} s ({} samples)",
        take.duration_secs(),
        take.len()
    );

    match PitchTracker::new(config.pitch).analyze(&take.samples, take.sample_rate) {
        Some(range) => {
            println!("  range            : {} - {}", range.low_note, range.high_note);
            let voice = classify_voice(range.low_hz, range.high_hz);
            println!("  voice type       : {} (score {:.3})", voice.voice_type, voice.score);
            for line in voice.explanation.lines() {
                println!("    {}", line);
            }
        }
        None => println!("  range            : no pitch detected"),
    }

    let model = default_model();
    let orchestrator = DenoiseOrchestrator::new(model.as_ref(), config.spectral);
    println!("  denoiser         : {}", orchestrator.strategy().name());
    let clean = orchestrator.denoise_samples(&take.samples, take.sample_rate);
    let residual = subtract(&take.samples, &clean);

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create '{}'", out_dir.display()))?;
    let clean_path = out_dir.join("clean.wav");
    let residual_path = out_dir.join("residual.wav");
    write_wav_file(&clean_path, &clean, take.sample_rate)?;
    write_wav_file(&residual_path, &residual, take.sample_rate)?;
    println!("  clean vocal      : {}", clean_path.display());
    println!("  residual noise   : {}", residual_path.display());
    Ok(())
}
