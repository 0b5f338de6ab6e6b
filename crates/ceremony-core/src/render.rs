//! Console presentation for the `ceremony` binary.

use std::io::{self, Write};
use std::time::Duration;

use ceremony_core::{CeremonyObserver, CollapseSummary, DecaySummary, PresentResult};
use ceremony_events::{AppliedEventRecord, Entity, Phase, ResolutionRecord};

const BAR_WIDTH: usize = 40;

/// Writes one line per presented event.
pub struct ConsoleRenderer<W: Write> {
    out: W,
    baseline: f64,
}

impl ConsoleRenderer<io::Stdout> {
    pub fn stdout(baseline: f64) -> Self {
        Self::new(io::stdout(), baseline)
    }
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W, baseline: f64) -> Self {
        Self { out, baseline }
    }

    fn bar(&self, state: f64) -> String {
        let displacement = state - self.baseline;
        let cells = ((displacement.abs() * 100.0).round() as usize).min(BAR_WIDTH);
        let fill = if displacement >= 0.0 { '#' } else { '~' };
        format!("{:+.3} |{}", displacement, fill.to_string().repeat(cells))
    }
}

fn mist_marker(intensity: f64) -> &'static str {
    match intensity {
        i if i < 0.008 => ".",
        i if i < 0.015 => ":",
        _ => "o",
    }
}

fn shock_marker(intensity: f64) -> &'static str {
    match intensity {
        i if i < 0.05 => "*",
        i if i < 0.12 => "**",
        i if i < 0.25 => "***",
        _ => "!!!",
    }
}

impl<W: Write> CeremonyObserver for ConsoleRenderer<W> {
    fn on_phase_start(&mut self, phase: Phase, budget: Duration) -> PresentResult {
        writeln!(self.out)?;
        writeln!(self.out, "== {} ({:.0}s) ==", phase, budget.as_secs_f64())?;
        Ok(())
    }

    fn on_phase_end(&mut self, _phase: Phase) -> PresentResult {
        self.out.flush()?;
        Ok(())
    }

    fn on_arrival(&mut self, entity: &Entity) -> PresentResult {
        writeln!(
            self.out,
            "  ?  {} drifts in ({} / {})",
            entity.label, entity.outcomes.first, entity.outcomes.second
        )?;
        Ok(())
    }

    fn on_resolution(&mut self, record: &ResolutionRecord) -> PresentResult {
        let echo = if record.resonance_echo { "  ~ echo" } else { "" };
        writeln!(
            self.out,
            "  => {}: {} (not {}) after {:.1}s{}",
            record.label, record.chosen_outcome, record.rejected_outcome, record.lifetime_secs, echo
        )?;
        Ok(())
    }

    fn on_ambient_event(&mut self, record: &AppliedEventRecord) -> PresentResult {
        writeln!(
            self.out,
            "  {:<3} {:<18} {}",
            mist_marker(record.intensity),
            record.label,
            self.bar(record.state_after)
        )?;
        Ok(())
    }

    fn on_shock_event(&mut self, record: &AppliedEventRecord, triggered: bool) -> PresentResult {
        if !triggered {
            return Ok(());
        }
        writeln!(
            self.out,
            "  {:<3} {:<18} {}",
            shock_marker(record.intensity),
            record.label,
            self.bar(record.state_after)
        )?;
        Ok(())
    }

    fn on_relief(&mut self, record: &AppliedEventRecord) -> PresentResult {
        writeln!(self.out, "  ( ) {:<18} {}", record.label, self.bar(record.state_after))?;
        Ok(())
    }
}

pub fn print_collapse_summary(summary: &CollapseSummary) {
    println!();
    println!("Ceremony Summary");
    println!("================");
    if let Some(intention) = &summary.intention {
        println!("Intention: {}", intention);
    }
    println!("Arrivals: {}", summary.arrivals);
    println!("Collapsed: {}", summary.resolutions);
    println!("Echoes: {}", summary.echoed);
    println!("Still unresolved: {}", summary.active_remaining);
    for entity in &summary.unresolved {
        println!("    {} ({} / {})", entity.label, entity.outcomes.first, entity.outcomes.second);
    }

    if !summary.outcomes.is_empty() {
        println!();
        println!("Outcomes:");
        for outcome in &summary.outcomes {
            println!("    {:<12} {}", outcome.outcome, outcome.count);
        }
    }

    if !summary.top_records.is_empty() {
        println!();
        println!("Most intense collapses:");
        for record in &summary.top_records {
            println!(
                "    {:.3}  {} -> {}  [{}]",
                record.intensity, record.label, record.chosen_outcome, record.timestamp
            );
        }
    }
    print_run_footer(summary.run.ticks, summary.run.elapsed_secs, summary.run.presentation_failures);
}

pub fn print_decay_summary(summary: &DecaySummary) {
    println!();
    println!("Ceremony Summary");
    println!("================");
    println!(
        "Events: {} ambient, {} active ({} announced), {} relief",
        summary.ambient_events, summary.active_events, summary.announced_events, summary.relief_events
    );
    for capped in &summary.capped {
        println!("    {}: {} / {}", capped.category_id, capped.occurrences, capped.max);
    }
    println!("Net accumulation: {:+.4}", summary.net_accumulation);
    println!(
        "Final state: {:.4} (baseline {:.2}, displacement {:+.4})",
        summary.final_state, summary.baseline, summary.displacement
    );
    if summary.lingering_calm() {
        println!("The calm lingers below baseline.");
    }

    if !summary.distribution.is_empty() {
        println!();
        println!("Distribution:");
        for entry in &summary.distribution {
            println!("    {:<18} {:>4}  {:>5.1}%", entry.label, entry.count, entry.percent);
        }
    }

    if !summary.most_intense.is_empty() {
        println!();
        println!("Most intense:");
        for record in &summary.most_intense {
            println!("    {:+.4}  {}  [{}]", record.intensity, record.label, record.timestamp);
        }
    }

    if !summary.most_relieving.is_empty() {
        println!();
        println!("Most relieving:");
        for record in &summary.most_relieving {
            println!("    {:+.4}  {}  [{}]", record.intensity, record.label, record.timestamp);
        }
    }
    print_run_footer(summary.run.ticks, summary.run.elapsed_secs, summary.run.presentation_failures);
}

fn print_run_footer(ticks: u64, elapsed_secs: f64, failures: usize) {
    println!();
    println!("Ran {} ticks in {:.1}s.", ticks, elapsed_secs);
    if failures > 0 {
        println!("{} presentation callbacks failed and were skipped.", failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceremony_events::CeremonyTimestamp;

    fn relief(state_after: f64) -> AppliedEventRecord {
        AppliedEventRecord {
            timestamp: CeremonyTimestamp::start(),
            category_id: "relief".to_string(),
            label: "Warming Rays".to_string(),
            intensity: -0.32,
            chaos_factor: 1.0,
            state_before: state_after + 0.32,
            state_after,
            is_ambient: false,
        }
    }

    #[test]
    fn test_sub_threshold_shock_is_silent() {
        let mut renderer = ConsoleRenderer::new(Vec::new(), 1.0);
        renderer.on_shock_event(&relief(1.0), false).unwrap();
        assert!(renderer.out.is_empty());
    }

    #[test]
    fn test_relief_line_shows_bar() {
        let mut renderer = ConsoleRenderer::new(Vec::new(), 1.0);
        renderer.on_relief(&relief(0.9)).unwrap();
        let text = String::from_utf8(renderer.out).unwrap();
        assert!(text.contains("Warming Rays"));
        assert!(text.contains("-0.100 |~~~~~~~~~~"));
    }

    #[test]
    fn test_markers_scale_with_intensity() {
        assert_eq!(shock_marker(0.03), "*");
        assert_eq!(shock_marker(0.3), "!!!");
        assert_eq!(mist_marker(0.001), ".");
        assert_eq!(mist_marker(0.02), "o");
    }
}
