use chrono::NaiveDate;
use clap::Parser;
use polars::prelude::{AnyValue, DataFrame};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use workplan::config::PlannerConfig;
use workplan::frame::{resource_load, schedule_to_dataframe};
use workplan::leave::Leave;
use workplan::persistence::{
    JsonFileStore, PersistenceResult, ScheduleStore, load_tasks_from_csv, save_schedule_to_csv,
};
use workplan::planner::Planner;
use workplan::state::PlanState;

#[derive(Parser, Debug)]
#[command(name = "cli", about = "Interactive work planner")]
struct Args {
    /// Config file; otherwise ./workplan.toml, then ~/.workplan/config.toml.
    #[arg(long)]
    config: Option<PathBuf>,
    /// State file (.json, or .db for SQLite) loaded at startup.
    #[arg(long)]
    state: Option<PathBuf>,
}

fn open_store(path: &Path) -> PersistenceResult<Box<dyn ScheduleStore>> {
    #[cfg(feature = "sqlite")]
    if matches!(path.extension().and_then(|e| e.to_str()), Some("db" | "sqlite")) {
        return Ok(Box::new(workplan::persistence::SqliteScheduleStore::new(path)?));
    }
    Ok(Box::new(JsonFileStore::new(path)))
}

fn load_state(path: &Path) -> Result<PlanState, String> {
    let store = open_store(path).map_err(|e| e.to_string())?;
    match store.load_state() {
        Ok(Some(state)) => Ok(state),
        Ok(None) => Err(format!("no plan stored at {}", path.display())),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn cell_text(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => s.to_string(),
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();
    let rows: Vec<Vec<String>> = (0..df.height())
        .map(|row_idx| {
            columns
                .iter()
                .map(|col| col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &rows {
        for (ci, cell) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(cell.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |cells: &[String]| {
        let mut line = String::from("|");
        for (ci, cell) in cells.iter().enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(cell.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_schedule(state: &PlanState) {
    match schedule_to_dataframe(&state.schedule) {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error: {}", e),
    }
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  load <path>                        Load a plan (.json or .db)\n  save <path>                        Save the plan (.json or .db)\n  import <tasks.csv>                 Replace tasks from a CSV file\n  start <YYYY-MM-DD>                 Set the scheduling start date\n  solve                              Solve the schedule\n  shift                              Move tasks off leave days\n  plan                               Solve, shift and report\n  risk                               Deadline risk and suggestions\n  critical                           Tasks ending at the makespan\n  show                               Show the schedule\n  utilization                        Scheduled minutes per resource\n  stats                              Record counts\n  leave add <id> <resource> <start> <end> [type]\n  leave remove <id>\n  export csv <path>                  Write the schedule as CSV\n  quit|exit                          Exit"
    );
}

fn main() {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => PlannerConfig::from_toml_file(path),
        None => PlannerConfig::discover(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(2);
        }
    };
    workplan::logging::init(&config.log_level);

    let mut state = PlanState::default();
    if let Some(path) = &args.state {
        match load_state(path) {
            Ok(loaded) => state = loaded,
            Err(e) => {
                eprintln!("Load error: {}", e);
                std::process::exit(1);
            }
        }
    }
    let mut planner = Planner::new(config);

    println!("Work planner (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "load" => match parts.next() {
                Some(path) => match load_state(Path::new(path)) {
                    Ok(loaded) => {
                        state = loaded;
                        println!("Loaded {} tasks.", state.tasks.len());
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: load <path>"),
            },
            "save" => match parts.next() {
                Some(path) => match open_store(Path::new(path)).and_then(|store| store.save_state(&state)) {
                    Ok(()) => println!("Saved."),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: save <path>"),
            },
            "import" => match parts.next() {
                Some(path) => match load_tasks_from_csv(path) {
                    Ok(tasks) => {
                        println!("Imported {} tasks.", tasks.len());
                        state.tasks = tasks;
                        state.schedule.clear();
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: import <tasks.csv>"),
            },
            "start" => match parts.next().and_then(parse_date) {
                Some(date) => {
                    state.start_date = Some(date);
                    println!("Start date set to {}.", date);
                }
                None => println!("Usage: start <YYYY-MM-DD>"),
            },
            "solve" => match planner.solve(&state) {
                Ok(solved) => {
                    state.schedule = solved.tasks;
                    println!("Solved ({}, makespan {}h)", solved.status, solved.makespan_hours);
                    print_schedule(&state);
                }
                Err(e) => println!("Solve error: {}", e),
            },
            "shift" => match planner.shift(&state, state.schedule.clone()) {
                Ok(outcome) => {
                    for adj in &outcome.adjustments {
                        println!("{} {:?}: {} -> {}", adj.task_id, adj.kind, adj.before_start, adj.after_start);
                    }
                    println!("{} adjustments.", outcome.adjustments.len());
                    state.schedule = outcome.schedule;
                    print_schedule(&state);
                }
                Err(e) => println!("Shift error: {}", e),
            },
            "plan" => match planner.run(&mut state) {
                Ok(report) => {
                    println!(
                        "Planned ({}, makespan {}h, {} adjustments, {} at risk)",
                        report.status,
                        report.makespan_hours,
                        report.adjustments.len(),
                        report.deadlines.at_risk_count()
                    );
                    print_schedule(&state);
                }
                Err(e) => println!("Plan error: {}", e),
            },
            "risk" => {
                let report = planner.analyze(&state);
                for project in &report.projects {
                    if project.at_risk.is_empty() {
                        println!("{}: on track for {}", project.project_id, project.deadline);
                    } else {
                        println!(
                            "{}: at risk for {}: {}",
                            project.project_id,
                            project.deadline,
                            project.at_risk.join(", ")
                        );
                    }
                }
                for suggestion in &report.suggestions {
                    println!(
                        "Reassign {} from {} to one of: {}",
                        suggestion.task_id,
                        suggestion.current_resource,
                        suggestion.alternatives.join(", ")
                    );
                }
                if report.projects.is_empty() {
                    println!("No project deadlines set.");
                }
            }
            "critical" => {
                let report = planner.analyze(&state);
                if report.critical_path.is_empty() {
                    println!("No schedule.");
                } else {
                    println!("Critical: {}", report.critical_path.join(", "));
                }
            }
            "show" => print_schedule(&state),
            "utilization" => match resource_load(&state.schedule) {
                Ok(df) => println!("{}", render_df_as_text_table(&df)),
                Err(e) => println!("Error: {}", e),
            },
            "stats" => {
                let stats = state.statistics();
                println!(
                    "projects={} tasks={} resources={} leaves={} scheduled={}",
                    stats.projects, stats.tasks, stats.resources, stats.leaves, stats.scheduled
                );
            }
            "leave" => match parts.next() {
                Some("add") => {
                    let id = parts.next();
                    let resource = parts.next();
                    let start = parts.next().and_then(parse_date);
                    let end = parts.next().and_then(parse_date);
                    match (id, resource, start, end) {
                        (Some(id), Some(resource), Some(start), Some(end)) => {
                            let mut leave = Leave::new(id, resource, start, end);
                            if let Some(kind) = parts.next() {
                                leave = leave.with_type(kind);
                            }
                            match state.add_leave(leave) {
                                Ok(()) => println!("Leave added."),
                                Err(e) => println!("Error: {}", e),
                            }
                        }
                        _ => println!("Usage: leave add <id> <resource> <YYYY-MM-DD> <YYYY-MM-DD> [type]"),
                    }
                }
                Some("remove") => match parts.next() {
                    Some(id) => match state.remove_leave(id) {
                        Some(_) => println!("Leave removed."),
                        None => println!("Error: leave {} not found", id),
                    },
                    None => println!("Usage: leave remove <id>"),
                },
                _ => println!("Usage: leave add|remove ..."),
            },
            "export" => match (parts.next(), parts.next()) {
                (Some("csv"), Some(path)) => match save_schedule_to_csv(&state.schedule, path) {
                    Ok(()) => println!("Exported {} rows.", state.schedule.len()),
                    Err(e) => println!("Error: {}", e),
                },
                _ => println!("Usage: export csv <path>"),
            },
            _ => println!("Unknown command. Type 'help'."),
        }
    }
}
