use hrm::{PpgConfig, PpgSession, PpgSource, SAMPLE_RATE_HZ};
use hrs_trace::{TraceReader, TraceRecorder};
use plotpy::{Curve, Plot};
use std::error::Error;

const USAGE: &str = "usage:
    analyze_hrm <hrs.data|samples.csv> [--plot] [--config <file>]
    analyze_hrm --simulate <bpm> [seconds] [--plot] [--config <file>] [--write-trace <file>]
    analyze_hrm --write-config <file>";

#[derive(serde::Deserialize)]
struct Row {
    val: u16,
}

/// Pulse riding on a slow baseline wander, like the simulated hrm driver.
struct SimulatedSensor {
    elapsed_millis: f32,
    bpm: f32,
}

impl PpgSource for SimulatedSensor {
    fn read_ppg(&mut self) -> u16 {
        let ms = self.elapsed_millis;
        self.elapsed_millis += 1000.0 / SAMPLE_RATE_HZ as f32;
        let beats_per_ms = self.bpm / (60.0 * 1000.0);
        let beat = ms * beats_per_ms;
        let norm_val = (beat * std::f32::consts::TAU).sin() * 0.2 + (beat * 0.1).sin() * 3.0;
        ((norm_val * 0.1 + 1.0) * 1024.0) as u16
    }
}

struct Window {
    label: String,
    samples: Vec<u16>,
}

#[derive(Default)]
struct Replay {
    processed: Vec<(f32, f32)>,
    rates: Vec<(f32, Option<u16>)>,
}

fn replay(samples: &[u16], config: &PpgConfig) -> Result<Replay, Box<dyn Error>> {
    let mut replay = Replay::default();
    let Some((offset, samples)) = samples.split_first() else {
        return Ok(replay);
    };

    let mut session = PpgSession::with_config(*offset, config).map_err(|e| e.to_string())?;
    for (i, raw) in samples.iter().enumerate() {
        let t = (i + 1) as f32 / SAMPLE_RATE_HZ as f32;
        let v = session.preprocess(*raw);
        replay.processed.push((t, v as f32));
        if session.is_ready() {
            replay.rates.push((t, session.get_heart_rate().map(|b| b.0)));
        }
    }
    Ok(replay)
}

fn load_windows(path: &str) -> Result<Vec<Window>, Box<dyn Error>> {
    if path.ends_with(".csv") {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut samples = Vec::new();
        for result in rdr.deserialize() {
            let row: Row = result?;
            samples.push(row.val);
        }
        return Ok(vec![Window {
            label: path.to_owned(),
            samples,
        }]);
    }

    let data = std::fs::read(path)?;
    let mut windows = Vec::new();
    for record in TraceReader::new(&data) {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                println!("{}: skipping record: {}", path, e);
                continue;
            }
        };
        windows.push(Window {
            label: record.start.to_string(),
            samples: record.samples().collect(),
        });
    }
    Ok(windows)
}

fn simulate(
    bpm: f32,
    seconds: usize,
    trace_path: Option<&str>,
) -> Result<Vec<Window>, Box<dyn Error>> {
    let mut sensor = SimulatedSensor {
        elapsed_millis: 0.0,
        bpm,
    };

    let mut recorder = TraceRecorder::<4096>::default();
    let mut samples = Vec::new();
    for _ in 0..seconds * SAMPLE_RATE_HZ as usize {
        let raw = sensor.read_ppg();
        hrm::TraceSink::record_sample(&mut recorder, raw, 0);
        samples.push(raw);
    }

    if let Some(path) = trace_path {
        let mut out: Vec<u8> = Vec::new();
        recorder.write_record(chrono::Local::now().naive_local(), &mut out);
        if recorder.dropped() > 0 {
            println!("trace truncated, {} samples dropped", recorder.dropped());
        }
        std::fs::write(path, out)?;
    }

    Ok(vec![Window {
        label: format!("simulated {} bpm", bpm),
        samples,
    }])
}

fn plot_values_multiple(vals: &[(&str, &[(f32, f32)])]) -> Result<(), Box<dyn Error>> {
    let mut plot = Plot::new();
    for (label, vals) in vals {
        let mut curve = Curve::new();
        curve.set_line_width(2.0);

        curve.points_begin();
        for (x, y) in *vals {
            curve.points_add(x, y);
        }
        curve.points_end();
        curve.set_label(label);

        plot.add(&curve);
    }

    if let Err(e) = plot
        .legend()
        .grid_and_labels("t [s]", "y")
        .save_and_show("out.svg")
    {
        println!("{}", e);
    }

    Ok(())
}

fn option_value<'a>(args: &'a [String], name: &str) -> Result<Option<&'a str>, Box<dyn Error>> {
    match args.iter().position(|a| a == name) {
        Some(i) => match args.get(i + 1) {
            Some(v) => Ok(Some(v.as_str())),
            None => Err(format!("{} needs a value\n{}", name, USAGE).into()),
        },
        None => Ok(None),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let plot = args.iter().any(|a| a == "--plot");

    if let Some(path) = option_value(&args, "--write-config")? {
        std::fs::write(path, PpgConfig::default().as_bytes())?;
        return Ok(());
    }

    let config = match option_value(&args, "--config")? {
        Some(path) => PpgConfig::from_bytes(&std::fs::read(path)?)
            .map_err(|e| format!("{}: {}", path, e))?,
        None => PpgConfig::default(),
    };

    let windows = if let Some(bpm) = option_value(&args, "--simulate")? {
        let bpm = bpm.parse::<f32>()?;
        let seconds = match args.iter().position(|a| a == "--simulate") {
            Some(i) => match args.get(i + 2).filter(|a| !a.starts_with("--")) {
                Some(s) => s.parse::<usize>()?,
                None => 60,
            },
            None => 60,
        };
        simulate(bpm, seconds, option_value(&args, "--write-trace")?)?
    } else {
        match args.first().filter(|a| !a.starts_with("--")) {
            Some(path) => load_windows(path)?,
            None => return Err(USAGE.into()),
        }
    };

    for window in windows {
        println!("{} ({} samples)", window.label, window.samples.len());
        let replay = replay(&window.samples, &config)?;
        for (t, bpm) in &replay.rates {
            match bpm {
                Some(bpm) => println!("  +{:6.1}s: {} bpm", t, bpm),
                None => println!("  +{:6.1}s: no estimate", t),
            }
        }

        if plot {
            let rates = replay
                .rates
                .iter()
                .filter_map(|(t, bpm)| bpm.map(|b| (*t, b as f32)))
                .collect::<Vec<_>>();
            plot_values_multiple(&[
                ("ppg", replay.processed.as_slice()),
                ("bpm", rates.as_slice()),
            ])?;
        }
    }

    Ok(())
}
