use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::time::Instant;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use avatar_overlay::config::Config;
use avatar_overlay::outfit::{MeshAction, OutfitRules};
use avatar_overlay::overlay::FrameOutcome;
use avatar_overlay::pose::PoseResult;
use avatar_overlay::recorder::RecordingPlan;
use avatar_overlay::renderer::{AvatarRenderer, PoseRenderer};
use avatar_overlay::session::SessionState;

const CONFIG_PATH: &str = "config.toml";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Chrome/124.0.0.0 Safari/537.36";

/// 衣装モードで割り当てを確認するアバターのメッシュ名
const AVATAR_MESHES: [&str; 10] = [
    "Wolf3D_Head",
    "Wolf3D_Body",
    "Wolf3D_Hair",
    "EyeLeft",
    "EyeRight",
    "Wolf3D_Teeth",
    "Wolf3D_Glasses",
    "Wolf3D_Outfit_Top",
    "Wolf3D_Outfit_Bottom",
    "Wolf3D_Outfit_Footwear",
];

#[derive(Debug, PartialEq)]
struct Args {
    frames_path: String,
    config_path: String,
    user_agent: String,
    query: String,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Args> {
    let mut args = args.into_iter();
    let mut frames_path = None;
    let mut config_path = CONFIG_PATH.to_string();
    let mut user_agent = DEFAULT_USER_AGENT.to_string();
    let mut query = String::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => config_path = args.next().context("--config needs a path")?,
            "--user-agent" => user_agent = args.next().context("--user-agent needs a value")?,
            "--query" => query = args.next().context("--query needs a value")?,
            _ if frames_path.is_none() => frames_path = Some(arg),
            _ => bail!("Unexpected argument: {}", arg),
        }
    }

    let Some(frames_path) = frames_path else {
        bail!("Usage: hands_up_replay <frames.jsonl> [--config config.toml] [--user-agent UA] [--query ?rear]");
    };
    Ok(Args {
        frames_path,
        config_path,
        user_agent,
        query,
    })
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(env_filter)
        .init();
}

/// 描画の代わりにフレーム数とメッシュ割り当てをログに出す
#[derive(Default)]
struct LogRenderer {
    frames: u64,
    mirror: bool,
    occluders: usize,
    hidden: usize,
}

impl PoseRenderer for LogRenderer {
    type Surface = ();

    fn update(&mut self, result: &PoseResult, _surface: &()) -> Result<()> {
        self.frames += 1;
        tracing::trace!(frame = self.frames, poses = result.poses.len(), "composite");
        Ok(())
    }

    fn set_mirror(&mut self, mirror: bool) {
        self.mirror = mirror;
    }

    fn load_outfit(&mut self, file: &str, rules: Option<&OutfitRules>) -> Result<()> {
        self.occluders = 0;
        self.hidden = 0;
        let Some(rules) = rules.filter(|rules| !rules.is_empty()) else {
            tracing::info!(file, "avatar mode");
            return Ok(());
        };
        for mesh in AVATAR_MESHES {
            let action = rules.resolve(mesh);
            match action {
                MeshAction::Occluder => self.occluders += 1,
                MeshAction::Hidden => self.hidden += 1,
                MeshAction::Visible => {}
            }
            tracing::debug!(mesh, ?action, "mesh");
        }
        tracing::info!(file, occluders = self.occluders, hidden = self.hidden, "outfit mode");
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
struct Summary {
    frames: u64,
    no_pose: u64,
    incomplete: u64,
    degenerate: u64,
    visible: u64,
    transitions: u64,
}

/// JSONL を1行1フレームとして流す。空行は読み飛ばす
fn replay<R: BufRead>(
    renderer: &mut AvatarRenderer<LogRenderer>,
    reader: R,
    source: &str,
) -> Result<Summary> {
    let mut summary = Summary::default();
    let mut prev_hands_up = renderer.hands_up();

    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let result: PoseResult = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: invalid frame", source, line_no + 1))?;

        let outcome = renderer.update(&result, &())?;
        summary.frames += 1;
        match outcome {
            FrameOutcome::NoPose => summary.no_pose += 1,
            FrameOutcome::Incomplete(missing) => {
                summary.incomplete += 1;
                tracing::debug!(line = line_no + 1, %missing, "incomplete pose");
            }
            FrameOutcome::Degenerate { .. } => summary.degenerate += 1,
            FrameOutcome::Classified { .. } => {}
        }

        let hands_up = renderer.hands_up();
        if hands_up != prev_hands_up {
            summary.transitions += 1;
            if let Some(text) = renderer.overlay() {
                let p = text.position;
                tracing::info!(
                    line = line_no + 1,
                    hands_up,
                    "{} at [{:.3}, {:.3}, {:.3}]",
                    if hands_up { "show" } else { "hide" },
                    p.x,
                    p.y,
                    p.z
                );
            }
            prev_hands_up = hands_up;
        }
        if renderer.overlay().is_some_and(|text| text.visible) {
            summary.visible += 1;
        }
    }
    Ok(summary)
}

fn main() -> Result<()> {
    init_tracing();
    let args = parse_args(std::env::args().skip(1))?;

    let config = Config::load_or_default(&args.config_path)?;
    let session = SessionState::from_query(&config, &args.query)?;
    let camera = session.camera_setup();
    let models: Vec<&str> = session.model_names().collect();
    tracing::info!(
        model = session.model(),
        avatar = session.avatar(),
        ?models,
        width = camera.width,
        height = camera.height,
        rear = camera.rear,
        "session"
    );

    let mut renderer = AvatarRenderer::from_config(LogRenderer::default(), &config)?;
    renderer.set_mirror(camera.mirror());
    renderer.apply(&session.outfit_request()?)?;
    if let Some(text) = renderer.overlay() {
        tracing::info!(text = %text.text, height_m = text.style.height_m(), "overlay");
    }

    let file = File::open(&args.frames_path)
        .with_context(|| format!("Failed to open {}", args.frames_path))?;
    let started = Instant::now();
    let summary = replay(&mut renderer, BufReader::new(file), &args.frames_path)?;

    let plan = RecordingPlan::new(&config.recorder, &args.user_agent);
    let base = renderer.base();
    println!("=== Hands Up Replay ===");
    println!("Model:        {} ({} occluders, {} hidden)", renderer.url(), base.occluders, base.hidden);
    println!("Frames:       {}", summary.frames);
    println!("No pose:      {}", summary.no_pose);
    println!("Incomplete:   {}", summary.incomplete);
    println!("Degenerate:   {}", summary.degenerate);
    println!("Transitions:  {}", summary.transitions);
    println!("Text visible: {} frames", summary.visible);
    println!("Composited:   {} frames (mirror: {})", base.frames, base.mirror);
    println!("Recording:    {} ({}, {}s)", plan.file_name, plan.format.mime_type(), plan.duration.as_secs());
    println!("Elapsed:      {:.1} ms", started.elapsed().as_secs_f64() * 1000.0);
    Ok(())
}
