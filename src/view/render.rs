//! HTML for each [`ViewState`].

use crate::constants::DEFAULT_AVATAR;
use crate::util::escape_html;
use crate::view::{Board, RecentRecord, Standing, TugOfWar, ViewState};

const TITLE: &str = "Braggin' Rights Log";

const STYLE: &str = r#"
body { margin: 0; min-height: 100vh; font-family: system-ui, sans-serif; color: #fff;
  background: linear-gradient(135deg, #111827, #000); display: flex; flex-direction: column;
  align-items: center; padding: 3rem 1rem; box-sizing: border-box; }
h1 { font-size: 2.75rem; margin-bottom: 2.5rem; text-align: center; }
.centered { flex: 1; display: flex; flex-direction: column; justify-content: center; align-items: center; }
.status { font-size: 1.5rem; }
.error { color: #f87171; }
.button { display: inline-block; margin-top: 1rem; padding: .5rem 1rem; border-radius: .5rem;
  background: #2563eb; color: #fff; text-decoration: none; font-weight: 600; }
.button.debug { background: #ca8a04; color: #000; margin: 0 0 1.5rem; }
.cards { width: 100%; max-width: 64rem; display: grid; gap: 1rem; margin-bottom: 2.5rem;
  grid-template-columns: repeat(auto-fit, minmax(14rem, 1fr)); }
.card { padding: 1.5rem; border-radius: .75rem; text-align: center;
  background: linear-gradient(45deg, #4f46e5, #9333ea, #db2777); }
.card img { width: 5rem; height: 5rem; border-radius: 50%; border: 4px solid #fff; background: #fff; }
.card .name { font-size: 1.5rem; font-weight: 700; margin-top: 1rem; }
.card .score { font-size: 3rem; font-weight: 800; margin-top: .5rem; }
.tug { width: 100%; max-width: 64rem; height: 2.5rem; display: flex; border-radius: 9999px;
  overflow: hidden; background: #374151; margin-bottom: 2rem; }
.tug .left { background: #3b82f6; } .tug .right { background: #ef4444; }
.panel { width: 100%; max-width: 64rem; background: rgba(31, 41, 55, .7); border-radius: .75rem;
  padding: 1.5rem; box-sizing: border-box; margin-bottom: 2rem; }
.panel pre, .panel .box { background: #111827; padding: .75rem; border-radius: .5rem; overflow-x: auto; }
table { width: 100%; text-align: left; border-collapse: collapse; }
th, td { padding: .5rem 1rem; border-bottom: 1px solid #4b5563; }
td.score { color: #4ade80; font-weight: 700; }
.muted { color: rgba(255, 255, 255, .6); font-size: .875rem; font-style: italic; }
"#;

/// Renders any state. `debug` controls the diagnostic panel and is carried through links.
pub fn render_page(state: &ViewState, debug: bool) -> String {
    let body = match state {
        ViewState::Loading => loading_body(debug),
        ViewState::Failure(message) => failure_body(message, &state.retry(), debug),
        ViewState::Success(board) => board_body(board, debug),
    };

    let refresh = match state {
        ViewState::Loading => format!(
            r#"<meta http-equiv="refresh" content="0; url={}">"#,
            page_link("/board", debug)
        ),
        _ => String::new(),
    };

    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         {refresh}\n<title>{TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

fn page_link(route: &str, debug: bool) -> String {
    if debug {
        format!("{route}?debug=1")
    } else {
        route.to_string()
    }
}

fn loading_body(debug: bool) -> String {
    format!(
        "<div class=\"centered\">\n<div class=\"status\">Loading leaderboard...</div>\n\
         <a class=\"muted\" href=\"{}\">taking a while? open the board</a>\n</div>\n",
        page_link("/board", debug)
    )
}

fn failure_body(message: &str, retry: &ViewState, debug: bool) -> String {
    format!(
        "<div class=\"centered\">\n<div class=\"status error\">Error: {}</div>\n\
         <a class=\"button retry\" href=\"{}\">Retry</a>\n</div>\n",
        escape_html(message),
        page_link(retry.route(), debug)
    )
}

fn board_body(board: &Board, debug: bool) -> String {
    let mut body = String::new();

    body.push_str(&format!("<h1>&#127942; {TITLE}</h1>\n"));
    body.push_str(&format!(
        "<a class=\"button debug\" href=\"{}\">{}</a>\n",
        page_link("/board", !debug),
        if debug { "Hide Debug Info" } else { "Show Debug Info" }
    ));

    if debug {
        body.push_str(&debug_panel(board));
    }

    body.push_str(&scorecards(&board.standings));

    if let Some(bar) = &board.tug_of_war {
        body.push_str(&tug_of_war_bar(bar));
    }

    body.push_str(&full_table(&board.standings));
    body.push_str(&format!(
        "<p class=\"muted\">Last updated: {}</p>\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    body
}

fn scorecards(standings: &[Standing]) -> String {
    let mut section = String::from("<div class=\"cards\">\n");

    for standing in standings {
        let name = escape_html(&standing.name);
        section.push_str(&format!(
            "<div class=\"card\">\n\
             <img src=\"{}\" alt=\"{name}\" onerror=\"this.onerror=null;this.src='{DEFAULT_AVATAR}'\">\n\
             <div class=\"name\">{name}</div>\n<div class=\"score\">{}</div>\n</div>\n",
            escape_html(&standing.avatar),
            standing.score
        ));
    }

    section.push_str("</div>\n");
    section
}

fn tug_of_war_bar(bar: &TugOfWar) -> String {
    let (left_name, left_pct) = &bar.left;
    let (right_name, right_pct) = &bar.right;

    format!(
        "<div class=\"tug\">\n\
         <div class=\"left\" title=\"{}\" style=\"width: {left_pct:.2}%\"></div>\n\
         <div class=\"right\" title=\"{}\" style=\"width: {right_pct:.2}%\"></div>\n</div>\n",
        escape_html(left_name),
        escape_html(right_name),
    )
}

fn full_table(standings: &[Standing]) -> String {
    let mut section = String::from(
        "<div class=\"panel\">\n<h2>Full Leaderboard</h2>\n<table>\n<thead>\n\
         <tr><th>Rank</th><th>Name</th><th>Score</th><th>Solved</th></tr>\n</thead>\n<tbody>\n",
    );

    for standing in standings {
        section.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td class=\"score\">{}</td><td>{}</td></tr>\n",
            standing.rank,
            escape_html(&standing.name),
            standing.score,
            standing.contributions
        ));
    }

    section.push_str("</tbody>\n</table>\n</div>\n");
    section
}

fn debug_panel(board: &Board) -> String {
    let mut section = String::from("<div class=\"panel debug-panel\">\n<h2>Debug Information</h2>\n");

    section.push_str(&format!(
        "<h3>Raw Scores Data:</h3>\n<pre>{}</pre>\n",
        escape_html(&board.raw_scores)
    ));

    section.push_str("<h3>All Participants Found:</h3>\n<div class=\"box\">\n");
    if board.standings.is_empty() {
        section.push_str("<span class=\"error\">No participants found!</span>\n");
    }
    for standing in &board.standings {
        section.push_str(&format!(
            "<div>&#10003; {} (Score: {})</div>\n",
            escape_html(&standing.name),
            standing.score
        ));
    }
    section.push_str("</div>\n");

    if !board.recent.is_empty() {
        section.push_str("<h3>Recently Processed:</h3>\n<div class=\"box\">\n");
        for record in &board.recent {
            section.push_str(&recent_record(record));
        }
        section.push_str("</div>\n");
    }

    section.push_str("</div>\n");
    section
}

fn recent_record(record: &RecentRecord) -> String {
    format!(
        "<div><strong>SHA:</strong> {} <strong>Author:</strong> {} \
         <strong>Points:</strong> {}<br><strong>Message:</strong> {}</div>\n",
        escape_html(&record.sha),
        escape_html(&record.author),
        record.points,
        escape_html(&record.message)
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn board(names: &[(&str, u32)]) -> Board {
        let standings: Vec<Standing> = names
            .iter()
            .enumerate()
            .map(|(idx, (name, score))| Standing {
                rank: idx + 1,
                name: name.to_string(),
                score: *score,
                contributions: *score as usize,
                avatar: format!("/avatars/{name}.svg"),
            })
            .collect();

        Board {
            tug_of_war: crate::view::tug_of_war(&standings),
            standings,
            raw_scores: String::from("{}"),
            recent: vec![RecentRecord {
                sha: String::from("abc123"),
                author: String::from("x"),
                message: String::from("[Easy] <script>"),
                points: 1,
            }],
        }
    }

    #[test]
    fn test_loading_hands_off_to_board() {
        let html = render_page(&ViewState::Loading, false);
        assert!(html.contains("Loading leaderboard..."));
        assert!(html.contains(r#"content="0; url=/board""#));

        let html = render_page(&ViewState::Loading, true);
        assert!(html.contains("url=/board?debug=1"));
    }

    #[test]
    fn test_failure_offers_retry() {
        let html = render_page(&ViewState::Failure(String::from("Error fetching data: 500")), false);
        assert!(html.contains("Error: Error fetching data: 500"));
        assert!(html.contains(r#"<a class="button retry" href="/">Retry</a>"#));
        assert!(!html.contains("http-equiv"));

        let html = render_page(&ViewState::Failure(String::from("boom")), true);
        assert!(html.contains(r#"<a class="button retry" href="/?debug=1">Retry</a>"#));
    }

    #[test]
    fn test_board_with_two_participants() {
        let html = render_page(&ViewState::Success(board(&[("a", 3), ("b", 1)])), false);

        assert!(html.contains("class=\"tug\""));
        assert!(html.contains("width: 75.00%"));
        assert!(html.contains("width: 25.00%"));
        assert!(html.contains("<tr><td>1</td><td>a</td><td class=\"score\">3</td><td>3</td></tr>"));
        assert!(html.contains(DEFAULT_AVATAR));
        assert!(html.contains("Show Debug Info"));
        assert!(!html.contains("debug-panel"));
    }

    #[test]
    fn test_board_without_bar() {
        let html = render_page(&ViewState::Success(board(&[("a", 3), ("b", 1), ("c", 0)])), false);
        assert!(!html.contains("class=\"tug\""));
    }

    #[test]
    fn test_debug_panel_escapes() {
        let html = render_page(&ViewState::Success(board(&[("a", 1)])), true);

        assert!(html.contains("debug-panel"));
        assert!(html.contains("Hide Debug Info"));
        assert!(html.contains("[Easy] &lt;script&gt;"));
        assert!(!html.contains("[Easy] <script>"));
    }

    #[test]
    fn test_empty_board_debug() {
        let html = render_page(&ViewState::Success(board(&[])), true);
        assert!(html.contains("No participants found!"));
    }
}
