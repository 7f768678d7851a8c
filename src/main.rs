//! Blowaway entry point
//!
//! - wasm: exposes [`WasmSession`](wasm_game::WasmSession) to the page, which
//!   owns the canvas, the pointer listeners and the `/log` flush timer.
//! - native: offline tools over recorded logs.
//!
//! ```text
//! blowaway replay <log.jsonl>      replayed derived events, as JSONL
//! blowaway verify <log.jsonl>      replay every session and compare
//! blowaway audit <log.jsonl>       structural checks per session
//! blowaway simulate [--seed N] [--frames N] [--out PATH]
//!                                  autopilot session, logged as JSONL
//! ```

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use wasm_bindgen::prelude::*;

    use blowaway::session::LiveSession;
    use blowaway::sim::Critter;

    fn js_error(e: impl std::fmt::Display) -> JsValue {
        JsValue::from_str(&e.to_string())
    }

    /// A live session driven by the page's animation frame callback
    #[wasm_bindgen]
    pub struct WasmSession {
        inner: LiveSession,
    }

    #[wasm_bindgen]
    impl WasmSession {
        /// New session with a fresh seed
        #[wasm_bindgen(constructor)]
        pub fn new() -> WasmSession {
            let inner = LiveSession::start(js_sys::Date::now());
            log::info!("Session {} started", inner.id());
            WasmSession { inner }
        }

        /// New session with a chosen seed (reproducing a reported run)
        pub fn with_seed(seed: u32) -> WasmSession {
            WasmSession {
                inner: LiveSession::new(seed, js_sys::Date::now()),
            }
        }

        pub fn session_id(&self) -> String {
            self.inner.id().to_string()
        }

        pub fn seed(&self) -> u32 {
            self.inner.state().seed
        }

        /// Pointer position in canvas coordinates
        pub fn set_pointer(&mut self, x: f64, y: f64) {
            self.inner.set_pointer(x, y);
        }

        /// Advance one frame; returns the number of events it produced
        pub fn step(&mut self) -> usize {
            self.inner.step(js_sys::Date::now()).len()
        }

        /// Queued records as a JSON array, emptying the queue
        pub fn take_batch(&mut self) -> Result<String, JsValue> {
            serde_json::to_string(&self.inner.drain_batch()).map_err(js_error)
        }

        pub fn pending(&self) -> usize {
            self.inner.pending()
        }

        pub fn score(&self) -> f64 {
            self.inner.state().score as f64
        }

        pub fn lives(&self) -> i32 {
            self.inner.state().player.lives
        }

        pub fn frame(&self) -> f64 {
            self.inner.state().frame as f64
        }

        pub fn aim(&self) -> f64 {
            self.inner.state().player.aim
        }

        pub fn is_game_over(&self) -> bool {
            self.inner.is_over()
        }

        /// Live critters for drawing
        pub fn critters_json(&self) -> Result<String, JsValue> {
            let critters: Vec<&Critter> = self.inner.state().all_critters().collect();
            serde_json::to_string(&critters).map_err(js_error)
        }

        /// Wind particles and score popups for drawing
        pub fn effects_json(&self) -> Result<String, JsValue> {
            let state = self.inner.state();
            serde_json::to_string(&serde_json::json!({
                "particles": state.particles,
                "popups": state.popups,
            }))
            .map_err(js_error)
        }
    }

    impl Default for WasmSession {
        fn default() -> Self {
            Self::new()
        }
    }

    pub fn init() {
        console_error_panic_hook::set_once();
        let _ = console_log::init_with_level(log::Level::Info);
        log::info!("Blowaway starting...");
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::init();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The page calls wasm_main; bins still need a main
}

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::error::Error;
    use std::fs;
    use std::path::PathBuf;
    use std::process::ExitCode;

    use blowaway::audit::audit_session;
    use blowaway::consts::{PX, PY};
    use blowaway::logfile::{group_sessions, read_jsonl, to_jsonl};
    use blowaway::session::{LiveSession, autopilot_target};
    use blowaway::sim::generate_seed;
    use blowaway::{LogRecord, replay, verify};

    pub type CliResult = Result<ExitCode, Box<dyn Error>>;

    const USAGE: &str = "usage:
  blowaway replay <log.jsonl>
  blowaway verify <log.jsonl>
  blowaway audit <log.jsonl>
  blowaway simulate [--seed N] [--frames N] [--out PATH]";

    pub fn run(args: &[String]) -> CliResult {
        match args {
            [cmd, path] if cmd == "replay" => replay_log(path),
            [cmd, path] if cmd == "verify" => verify_log(path),
            [cmd, path] if cmd == "audit" => audit_log(path),
            [cmd, rest @ ..] if cmd == "simulate" => simulate(rest),
            _ => {
                eprintln!("{USAGE}");
                Ok(ExitCode::from(2))
            }
        }
    }

    fn replay_log(path: &str) -> CliResult {
        for (session, records) in group_sessions(read_jsonl(path)?) {
            let t = records.first().map_or(0.0, |r| r.t);
            let replayed: Vec<LogRecord> = replay(&records)?
                .iter()
                .map(|e| e.to_record(&session, t))
                .collect();
            print!("{}", to_jsonl(&replayed)?);
        }
        Ok(ExitCode::SUCCESS)
    }

    fn verify_log(path: &str) -> CliResult {
        let mut failed = 0;
        let sessions = group_sessions(read_jsonl(path)?);
        for (session, records) in &sessions {
            match verify(records) {
                Ok(report) => {
                    println!("{report}");
                    if !report.is_match() {
                        failed += 1;
                    }
                }
                Err(e) => {
                    println!("{session}: cannot replay: {e}");
                    failed += 1;
                }
            }
        }
        log::info!("{} of {} sessions verified", sessions.len() - failed, sessions.len());
        Ok(if failed == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    fn audit_log(path: &str) -> CliResult {
        let mut dirty = 0;
        for (session, records) in group_sessions(read_jsonl(path)?) {
            let violations = audit_session(&records);
            if violations.is_empty() {
                println!("{session}: clean ({} events)", records.len());
                continue;
            }
            dirty += 1;
            println!("{session}: {} violations", violations.len());
            for v in violations {
                println!("  {v}");
            }
        }
        Ok(if dirty == 0 {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        })
    }

    fn simulate(args: &[String]) -> CliResult {
        let mut seed = None;
        let mut frames: u64 = 3600;
        let mut out: Option<PathBuf> = None;

        let mut it = args.iter();
        while let Some(flag) = it.next() {
            let value = it
                .next()
                .ok_or_else(|| format!("missing value for {flag}"))?;
            match flag.as_str() {
                "--seed" => seed = Some(value.parse::<u32>()?),
                "--frames" => frames = value.parse()?,
                "--out" => out = Some(PathBuf::from(value)),
                other => return Err(format!("unknown flag {other}").into()),
            }
        }

        let seed = seed.unwrap_or_else(generate_seed);
        let mut session = LiveSession::new(seed, 0.0);
        // 60 frames per second of wall-clock time
        for frame in 0..frames {
            let target = autopilot_target(session.state())
                .unwrap_or(glam::DVec2::new(PX + 150.0, PY));
            session.set_pointer(target.x, target.y);
            session.step(frame as f64 * 1000.0 / 60.0);
            if session.is_over() {
                break;
            }
        }

        let state = session.state();
        log::info!(
            "Seed {} ran {} frames: score {}, lives {}",
            seed,
            state.frame,
            state.score,
            state.player.lives
        );

        let text = to_jsonl(&session.drain_batch())?;
        match out {
            Some(path) => fs::write(&path, text)?,
            None => print!("{text}"),
        }
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .try_init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match cli::run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}
