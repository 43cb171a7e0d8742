//! stemdeck demo
//!
//! Drives the playback engine through a scripted session over simulated
//! media elements: load a mix plus two stems, play, switch the audible
//! track mid-playback, tap a tempo, create a one-bar loop, scrub, and
//! export a selection. Everything runs against a simulated clock, so the
//! run is deterministic; set RUST_LOG=debug to watch the engine work.

use anyhow::Result;
use stemdeck_engine::{
    Player, PlayerConfig, PlayerEvent, TrackDescriptor, TrackId, TrackKind, Word,
};
use stemdeck_media::SimulatedElement;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Simulated tick interval, one display frame
const DT: f64 = 1.0 / 60.0;

struct Demo {
    player: Player<SimulatedElement>,
    elements: Vec<SimulatedElement>,
    events: crossbeam_channel::Receiver<PlayerEvent>,
    now: f64,
}

impl Demo {
    fn new() -> Result<Self> {
        let mut player = Player::new(PlayerConfig::default());
        let events = player.events();

        let specs: [(&str, TrackKind, f64, f64); 3] = [
            ("mix", TrackKind::Original, 0.0, 0.0),
            ("vocals", TrackKind::Stem, 0.25, 0.05),
            ("drums", TrackKind::Stem, 0.4, 0.05),
        ];
        let mut elements = Vec::new();
        let mut tracks = Vec::new();
        for (id, kind, metadata_latency, seek_latency) in specs {
            let element =
                SimulatedElement::with_latency(format!("{id}.mp3"), 180.0, metadata_latency, seek_latency);
            elements.push(element.clone());
            tracks.push((
                TrackDescriptor {
                    id: TrackId::new(id),
                    label: id.to_uppercase(),
                    kind,
                    audio_url: format!("https://cdn.example/{id}.mp3"),
                    download_url: Some(format!("https://cdn.example/{id}.wav")),
                },
                element,
            ));
        }
        player.load_tracks(tracks)?;

        // Synthesized stems so the waveforms have something to show
        for (i, id) in ["mix", "vocals", "drums"].iter().enumerate() {
            let samples = tone(110.0 * (i + 1) as f32, 44_100, 2.0);
            player.attach_samples(&TrackId::new(*id), &samples, 44_100, 180.0)?;
        }

        player.set_transcript(
            vec![
                Word { word: "one".into(), start: 0.5, end: 0.9 },
                Word { word: "two".into(), start: 1.0, end: 1.4 },
                Word { word: "three".into(), start: 1.5, end: 1.9 },
            ],
            None,
        );

        Ok(Self {
            player,
            elements,
            events,
            now: 0.0,
        })
    }

    /// Run the simulated clock forward, ticking the engine every frame
    fn run_for(&mut self, seconds: f64) {
        let frames = (seconds / DT).ceil() as usize;
        for _ in 0..frames {
            self.now += DT;
            for element in &self.elements {
                element.advance(DT);
            }
            self.player.tick(self.now);
        }
        for event in self.events.try_iter() {
            match event {
                PlayerEvent::Warning(msg) => info!(%msg, "warning"),
                PlayerEvent::ExportRequested { track, start, end } => {
                    info!(%track, start, end, "export requested")
                }
                PlayerEvent::StateUpdate(_) => {}
            }
        }
    }

    fn report(&self, label: &str) {
        let s = self.player.snapshot();
        info!(
            label,
            t = format!("{:.2}", s.current_time),
            playing = s.is_playing,
            track = %s.active_track,
            bpm = s.bpm,
            "session"
        );
    }
}

/// A mono sine tone duplicated into interleaved stereo
fn tone(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * seconds) as usize;
    let mut samples = Vec::with_capacity(frames * 2);
    for n in 0..frames {
        let v = (2.0 * std::f32::consts::PI * freq * n as f32 / sample_rate as f32).sin() * 0.5;
        samples.push(v);
        samples.push(v);
    }
    samples
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut demo = Demo::new()?;
    demo.report("loaded");

    demo.player.play()?;
    demo.run_for(2.0);
    demo.report("playing the mix");

    if let Some(word) = demo.player.current_word() {
        info!(word = %word.word, "under the playhead");
    }

    // Glitch-free switch to the vocal stem while playing
    demo.player
        .set_active_track(&TrackId::new("vocals"), demo.now)?;
    demo.run_for(1.0);
    demo.report("switched to vocals");

    // Tap in a tempo, then loop one bar at the playhead
    let now = demo.now;
    let bpm = (0..4)
        .filter_map(|i| demo.player.tap_tempo(now + i as f64 * 0.5))
        .last();
    info!(?bpm, "tapped tempo");
    demo.player.toggle_grid();
    let loop_id = demo.player.create_loop(1)?;
    info!(?loop_id, "one-bar loop created");
    demo.run_for(4.0);
    demo.report("looping");
    demo.player.remove_loop(loop_id);

    // Scrub forward on the drums surface, then let it play out
    demo.player.begin_scrub(&TrackId::new("drums"), demo.now)?;
    demo.player.scrub_to(demo.now + 0.1, 30.0);
    let _ = demo.player.end_scrub();
    demo.run_for(1.0);
    demo.report("after scrub");

    demo.player
        .export_selection(&TrackId::new("drums"), 30.0, 34.0)?;
    demo.run_for(0.1);

    demo.player.pause();
    demo.report("paused");
    Ok(())
}
