//! CLI application for generating perturbed initial bounding boxes.
//!
//! Usage:
//!   percent-fit <image> --bbox 100,50,120,135              # Human-readable output
//!   percent-fit <image> --bbox 100,50,120,135 --json       # JSON output
//!   percent-fit <image> --bbox 100,50,120,135 -o boxes.json --json

use clap::Parser;
use image::GenericImageView;
use log::{debug, info};
use percent_fit::{
    bounding_box_perturbation, generate_perturbations_from_gt, BoundingBox, Image,
    NoisePercentage, NoiseType, PerturbOptions, PerturbationConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::path::PathBuf;

const GT_GROUP: &str = "gt";

#[derive(Parser, Debug)]
#[command(name = "percent-fit")]
#[command(author, version, about = "Perturbed bounding boxes for fitting initialisation", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required = true)]
    image: PathBuf,

    /// Ground-truth box as x,y,width,height
    #[arg(long, value_parser = parse_bbox)]
    bbox: BoundingBox,

    /// Number of perturbed boxes to generate
    #[arg(short = 'n', long, default_value = "10")]
    n_perturbations: usize,

    /// Noise distribution (uniform or gaussian)
    #[arg(long, default_value = "uniform")]
    noise_type: String,

    /// Noise percentage: one value, or scale,rotation,translation
    #[arg(long, default_value = "0.05")]
    noise: String,

    /// Estimate the base alignment with rotation
    #[arg(long)]
    rotation: bool,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Configuration file; its perturbation settings override the flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Output {
    image: String,
    width: u32,
    height: u32,
    noise_type: NoiseType,
    noise_percentage: NoisePercentage,
    seed: Option<u64>,
    ground_truth: BoundingBox,
    boxes: Vec<BoxOutput>,
}

#[derive(Serialize)]
struct BoxOutput {
    /// Box index (matches the `__generated_bb_{index}` group)
    index: usize,
    #[serde(flatten)]
    bounding_box: BoundingBox,
    /// Intersection over union with the ground-truth box
    iou: f64,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let (options, n_perturbations) = match &args.config {
        Some(path) => {
            info!("Loading configuration {:?}...", path);
            let config = PerturbationConfig::load(path)?;
            (config.perturb_options(), config.n_perturbations)
        }
        None => {
            let noise_type: NoiseType = args.noise_type.parse()?;
            let noise = parse_noise(&args.noise)?;
            let options = PerturbOptions::new(noise_type, noise).with_rotation(args.rotation);
            (options, args.n_perturbations)
        }
    };
    debug!("{:?}, {} perturbations", options, n_perturbations);

    info!("Loading image {:?}...", args.image);
    let img = image::open(&args.image)?;
    let (width, height) = img.dimensions();

    let mut image = Image::from_dynamic(&img)?;
    image.landmarks.insert(GT_GROUP, args.bbox.to_shape());
    let mut images = vec![image];

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let generated = generate_perturbations_from_gt(
        &mut images,
        n_perturbations,
        bounding_box_perturbation(options, &mut rng),
        GT_GROUP,
        None,
        args.verbose,
    )?;

    let boxes = generated(&images[0])
        .iter()
        .enumerate()
        .map(|(index, shape)| {
            let bounding_box = shape.bounds_rect();
            BoxOutput {
                index,
                iou: iou(&bounding_box, &args.bbox),
                bounding_box,
            }
        })
        .collect();

    let output = Output {
        image: args.image.display().to_string(),
        width,
        height,
        noise_type: options.noise_type,
        noise_percentage: options.noise_percentage,
        seed: args.seed,
        ground_truth: args.bbox,
        boxes,
    };

    let output_str = if args.json {
        serde_json::to_string_pretty(&output)?
    } else {
        format_human_readable(&output)
    };

    if let Some(ref path) = args.output {
        std::fs::write(path, &output_str)?;
        info!("Output written to {:?}", path);
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

fn parse_bbox(s: &str) -> Result<BoundingBox, String> {
    let values = parse_floats(s)?;
    match values[..] {
        [x, y, w, h] if w > 0.0 && h > 0.0 => Ok(BoundingBox::new(x, y, w, h)),
        [_, _, _, _] => Err("width and height must be positive".to_string()),
        _ => Err(format!("expected x,y,width,height, got {} values", values.len())),
    }
}

fn parse_noise(s: &str) -> percent_fit::Result<NoisePercentage> {
    let values = parse_floats(s).map_err(percent_fit::Error::InvalidArgument)?;
    NoisePercentage::from_slice(&values)
}

fn parse_floats(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid number '{}': {}", v.trim(), e))
        })
        .collect()
}

fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let x0 = a.x.max(b.x);
    let y0 = a.y.max(b.y);
    let x1 = (a.x + a.width).min(b.x + b.width);
    let y1 = (a.y + a.height).min(b.y + b.height);
    let inter = (x1 - x0).max(0.0) * (y1 - y0).max(0.0);
    let union = a.width * a.height + b.width * b.height - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

fn format_human_readable(output: &Output) -> String {
    let mut s = String::new();

    s.push_str(&format!("Image: {} ({}x{})\n", output.image, output.width, output.height));
    let gt = &output.ground_truth;
    s.push_str(&format!(
        "Ground truth: {:.1}x{:.1} at ({:.1}, {:.1})\n",
        gt.width, gt.height, gt.x, gt.y
    ));
    s.push_str(&format!(
        "Noise: {} [scale {:.3}, rotation {:.3}, translation {:.3}]\n",
        output.noise_type,
        output.noise_percentage.scale(),
        output.noise_percentage.rotation(),
        output.noise_percentage.translation()
    ));
    if let Some(seed) = output.seed {
        s.push_str(&format!("Seed: {}\n", seed));
    }

    if output.boxes.is_empty() {
        s.push_str("\nNo boxes generated.\n");
        return s;
    }

    s.push_str(&format!("\nGenerated boxes ({}):\n", output.boxes.len()));
    for b in &output.boxes {
        let bb = &b.bounding_box;
        s.push_str(&format!(
            "  {:>3}: {:.1}x{:.1} at ({:.1}, {:.1})  IoU {:.3}\n",
            b.index, bb.width, bb.height, bb.x, bb.y, b.iou
        ));
    }

    s
}
