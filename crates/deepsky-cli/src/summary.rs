use console::Style;

use deepsky_core::checks::CheckReport;
use deepsky_core::config::ProjectConfig;
use deepsky_core::frame::FrameKind;
use deepsky_core::pipeline::{FrameOutcome, PipelineReport};
use deepsky_core::session::Session;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    warn: Style,
    bad: Style,
    disabled: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            warn: Style::new().yellow(),
            bad: Style::new().red(),
            disabled: Style::new().dim().yellow(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(config: &ProjectConfig, session: &Session, save_library: bool) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Deepsky Pipeline"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Workdir"),
        s.path.apply_to(session.working_dir().display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Layout"),
        s.value.apply_to(if session.multi_night() {
            "multi-night"
        } else {
            "single night"
        })
    );
    println!();

    println!("  {}", s.header.apply_to("Frames"));
    for kind in FrameKind::ORDER {
        let Some(frame) = session.frame(kind) else {
            continue;
        };
        let dir = session.source_path(frame);
        let status = if Session::has_captures(&dir) {
            s.good.apply_to("present")
        } else {
            s.disabled.apply_to("absent")
        };
        println!("    {:<12}{}", s.label.apply_to(kind.to_string()), status);
    }
    println!();

    println!("  {}", s.header.apply_to("Master Library"));
    match &config.library.biases {
        Some(root) => println!(
            "    {:<12}{}",
            s.label.apply_to("biases"),
            s.path.apply_to(root.display())
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("biases"),
            s.disabled.apply_to("not configured")
        ),
    }
    match &config.library.darks {
        Some(root) => println!(
            "    {:<12}{}",
            s.label.apply_to("darks"),
            s.path.apply_to(root.display())
        ),
        None => println!(
            "    {:<12}{}",
            s.label.apply_to("darks"),
            s.disabled.apply_to("not configured")
        ),
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("save"),
        s.value.apply_to(if save_library { "yes" } else { "no" })
    );
    println!();

    println!("  {}", s.header.apply_to("Post-Processing"));
    if config.post.enabled {
        println!(
            "    {:<12}{}",
            s.label.apply_to("denoise"),
            s.value
                .apply_to(if config.post.denoise_starless { "AI" } else { "engine" })
        );
        println!(
            "    {:<12}{}",
            s.label.apply_to("smoothing"),
            s.value.apply_to(config.graxpert.smoothing)
        );
    } else {
        println!("    {}", s.disabled.apply_to("disabled"));
    }
    println!();
}

pub fn print_report(report: &PipelineReport) {
    let s = Styles::new();

    println!();
    println!("  {}", s.header.apply_to("Results"));
    for frame in &report.frames {
        match &frame.outcome {
            FrameOutcome::Done(path) => println!(
                "    {:<12}{} {}",
                s.label.apply_to(frame.kind.to_string()),
                s.good.apply_to("\u{2713}"),
                s.path.apply_to(path.display())
            ),
            FrameOutcome::Skipped => println!(
                "    {:<12}{}",
                s.label.apply_to(frame.kind.to_string()),
                s.disabled.apply_to("skipped")
            ),
            FrameOutcome::Failed(reason) => println!(
                "    {:<12}{} {}",
                s.label.apply_to(frame.kind.to_string()),
                s.bad.apply_to("\u{2717}"),
                s.bad.apply_to(reason)
            ),
        }
        for night in &frame.nights {
            if night.night.is_empty() {
                continue;
            }
            let outcome = match &night.outcome {
                FrameOutcome::Done(_) => s.good.apply_to("\u{2713}"),
                FrameOutcome::Skipped => s.disabled.apply_to("skipped"),
                FrameOutcome::Failed(_) => s.bad.apply_to("\u{2717}"),
            };
            println!(
                "      {:<10}{}",
                s.label.apply_to(format!("night {}", night.night)),
                outcome
            );
        }
    }
    println!();
}

pub fn print_check_report(report: &CheckReport) {
    let s = Styles::new();

    println!();
    if !report.passed.is_empty() {
        println!("  {}", s.good.apply_to("\u{25b8} Passed"));
        for item in &report.passed {
            println!("    {} {}", s.good.apply_to("\u{2713}"), item);
        }
    }
    if !report.warnings.is_empty() {
        println!("  {}", s.warn.apply_to("\u{25b8} Warnings"));
        for item in &report.warnings {
            println!("    {} {}", s.warn.apply_to("\u{26a0}"), item);
        }
    }
    if !report.failures.is_empty() {
        println!("  {}", s.bad.apply_to("\u{25b8} Failed"));
        for item in &report.failures {
            println!("    {} {}", s.bad.apply_to("\u{2717}"), item);
        }
    }
    println!();
}
