use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;

use crate::grading::{CaseOutcome, Failure, Table, Verdict};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    match v.as_str() {
        "truecolor" | "24bit" => true,
        _ => false,
    }
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                Pass => Color::Green,
                Fail => Color::Red,
            };
        }

        match self {
            Pass => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            Fail => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
        }
    }
}

pub fn verdict_icon(verdict: Verdict) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", verdict)
        .on_color(verdict.color())
        .bold()
        .color(fg)
}

pub fn print_run_summary(outcomes: &[CaseOutcome]) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let num_total = outcomes.len();
    let num_passed = outcomes.iter().filter(|o| o.passed()).count();
    let num_failed = num_total - num_passed;

    if num_passed == num_total {
        let msg = format!("All {} test cases passed ✨", num_total);
        print!("{}", msg.green());
    } else if num_passed > 0 {
        let msg = format!("{}/{} test cases failed 💣", num_failed, num_total);
        print!("{}", msg.bright_red());
    } else {
        let msg = format!("All {} test cases failed 💀", num_total);
        print!("{}", msg.bright_red());
    }

    println!(" {}", bar);
}

pub fn print_failure_detail(res: &CaseOutcome) {
    let Some(failure) = &res.failure else {
        return;
    };

    let (cols, _) = terminal::size().unwrap_or((40, 40));

    const BOLD_LINE: &str = "━";
    const THIN_LINE: &str = "─";

    let bold_bar = BOLD_LINE.repeat(cols as usize).blue().bold();

    let title_color = Color::BrightYellow;
    println!(
        "\n{}: {} [{}ms]\n{}",
        res.name.color(title_color).bold(),
        verdict_icon(res.verdict),
        res.total_time.as_millis(),
        bold_bar,
    );

    let Failure {
        index,
        command,
        reason,
        expected_table,
        observed_table,
    } = failure;

    println!(
        "command #{}: {}",
        index + 1,
        format!("'{}'", command).bold().bright_white(),
    );
    println!("{}", reason.to_string().bright_red().bold());

    fn print_sub_title(s: &str, cols: usize) {
        println!(
            "{}{}",
            s.cyan().bold(),
            THIN_LINE.repeat(cols.saturating_sub(s.len() + 1)).bright_black(),
        )
    }

    fn print_table(table: &Option<Table>) {
        match table {
            None => println!("{}", "<NO DISPLAY>".magenta().dimmed()),
            Some(t) if t.is_empty() => println!("{}", "<EMPTY>".magenta().dimmed()),
            Some(t) => print!("{}", t),
        }
    }

    print_sub_title("[expected-display]", cols as usize);
    print_table(expected_table);

    print_sub_title("[observed-display]", cols as usize);
    print_table(observed_table);

    println!("{}", bold_bar);
}
