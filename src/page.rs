//! Index page listing the segments, team and model status

use crate::server::AppContext;

const INDEX_HTML: &str = include_str!("ui/index.html");

/// Render `GET /` from the shared context
pub fn render_index(context: &AppContext) -> String {
    let status = if context.model_loaded() {
        r#"<span class="status ready">Loaded</span>"#
    } else {
        r#"<span class="status unavailable">Not loaded</span>"#
    };

    let clusters: Vec<String> = context
        .catalog
        .iter()
        .map(|cluster| {
            format!(
                r#"      <article class="cluster" style="border-top-color: {color}">
        <h3>{id}. {name}</h3>
        <p>{description}</p>
        <p><strong>Strategy:</strong> {strategy}</p>
      </article>"#,
                color = escape_html(cluster.color),
                id = cluster.id,
                name = escape_html(cluster.name),
                description = escape_html(cluster.description),
                strategy = escape_html(cluster.strategy),
            )
        })
        .collect();

    let team: Vec<String> = context
        .team
        .iter()
        .map(|member| format!("      <li>{}</li>", escape_html(member)))
        .collect();

    INDEX_HTML
        .replace("{{status}}", status)
        .replace("{{clusters}}", &clusters.join("\n"))
        .replace("{{team}}", &team.join("\n"))
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
