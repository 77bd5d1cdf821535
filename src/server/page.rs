//! The single HTML page served at `/`.
//!
//! Plain HTML, CSS and vanilla JavaScript; the page talks to the JSON API
//! with `fetch`. Brand colours, the brand name and the objective placeholder
//! are substituted once when the server starts.

use crate::config::ReportConfig;
use crate::prompts::OBJECTIVE_HINT;

const TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{{BRAND}} KPI Dashboard Analyzer</title>
<style>
  :root { --primary: {{PRIMARY}}; --accent: {{ACCENT}}; --text: {{TEXT}}; --muted: {{MUTED}}; --bg: {{BACKGROUND}}; }
  * { box-sizing: border-box; }
  body { margin: 0; font-family: Helvetica, Arial, sans-serif; color: var(--text); background: #fff; }
  header { background: var(--bg); border-bottom: 3px solid var(--accent); padding: 18px 32px; display: flex; align-items: center; justify-content: space-between; }
  header h1 { margin: 0; color: var(--primary); font-size: 26px; letter-spacing: 1px; }
  header p { margin: 4px 0 0; color: var(--accent); }
  .bars span { display: block; width: 60px; }
  .bars .p { height: 4px; background: var(--primary); margin-bottom: 2px; }
  .bars .a { height: 8px; background: var(--accent); }
  main { display: grid; grid-template-columns: minmax(280px, 1fr) 2fr; gap: 28px; padding: 24px 32px; }
  h2 { color: var(--primary); font-size: 18px; margin: 0 0 12px; }
  label { font-weight: bold; display: block; margin: 16px 0 6px; }
  textarea { width: 100%; min-height: 140px; padding: 10px; font: inherit; border: 1px solid #ced4da; border-radius: 6px; }
  button { font: inherit; cursor: pointer; border-radius: 6px; border: none; padding: 10px 18px; }
  .primary { background: var(--primary); color: #fff; width: 100%; margin-top: 16px; }
  .primary:disabled { opacity: .5; cursor: wait; }
  .secondary { background: var(--accent); color: #fff; }
  .examples button { background: var(--bg); color: var(--primary); border: 1px solid var(--accent); margin: 0 6px 6px 0; padding: 6px 10px; }
  .banner { display: none; background: #fff3cd; border: 1px solid #ffe69c; padding: 12px 32px; }
  .error { color: #b02a37; margin-top: 12px; white-space: pre-wrap; }
  .info { background: var(--bg); border-radius: 6px; padding: 10px 14px; margin-top: 12px; font-size: 14px; }
  .tabs button { background: none; border-bottom: 3px solid transparent; border-radius: 0; color: var(--muted); }
  .tabs button.active { color: var(--primary); border-bottom-color: var(--accent); }
  .tab { display: none; padding: 16px 0; }
  .tab.active { display: block; }
  #analysis { white-space: pre-wrap; line-height: 1.5; }
  #objective-view { font-style: italic; border: 1px solid var(--accent); background: var(--bg); padding: 15px; }
  #preview { max-width: 100%; border: 1px solid #dee2e6; }
  .muted { color: var(--muted); }
</style>
</head>
<body>
<header>
  <div><h1>{{BRAND}}</h1><p>{{SUBTITLE}}</p></div>
  <div class="bars"><span class="p"></span><span class="a"></span></div>
</header>
<div class="banner" id="model-banner"></div>
<main>
  <section>
    <h2>Dashboard</h2>
    <label for="image">Dashboard image (PNG, JPG, JPEG)</label>
    <input type="file" id="image" accept=".png,.jpg,.jpeg,image/png,image/jpeg">
    <div class="info" id="image-info" hidden></div>

    <label for="objective">Business objective</label>
    <textarea id="objective" placeholder="{{HINT}}"></textarea>
    <div class="examples" id="examples"></div>

    <button class="primary" id="analyze-btn">Analyze dashboard</button>
    <div class="error" id="error"></div>
  </section>

  <section>
    <h2>Results</h2>
    <div class="tabs">
      <button class="active" data-tab="tab-analysis">Analysis</button>
      <button data-tab="tab-objective">Objective</button>
      <button data-tab="tab-dashboard">Dashboard</button>
    </div>
    <div class="tab active" id="tab-analysis">
      <div id="analysis" class="muted">Upload a dashboard and describe its objective to get started.</div>
      <p><button class="secondary" id="download-btn" hidden>Download PDF report</button></p>
    </div>
    <div class="tab" id="tab-objective"><div id="objective-view" class="muted">No analysis yet.</div></div>
    <div class="tab" id="tab-dashboard"><img id="preview" alt="Dashboard preview" hidden></div>
  </section>
</main>
<footer class="muted" style="padding: 0 32px 24px">Powered by Ollama {{MODEL}}</footer>
<script>
(() => {
  const $ = (id) => document.getElementById(id);
  let result = null;

  document.querySelectorAll('.tabs button').forEach((btn) => {
    btn.addEventListener('click', () => {
      document.querySelectorAll('.tabs button').forEach((b) => b.classList.remove('active'));
      document.querySelectorAll('.tab').forEach((t) => t.classList.remove('active'));
      btn.classList.add('active');
      $(btn.dataset.tab).classList.add('active');
    });
  });

  fetch('/api/objectives').then((r) => r.json()).then((list) => {
    list.forEach((ex) => {
      const b = document.createElement('button');
      b.textContent = ex.label;
      b.title = ex.text;
      b.addEventListener('click', () => { $('objective').value = ex.text; });
      $('examples').appendChild(b);
    });
  }).catch(() => {});

  fetch('/api/health').then((r) => r.json()).then((h) => {
    const s = h.model_status;
    if (s.state === 'missing') {
      $('model-banner').textContent = 'Model ' + h.model + ' is not available. Run: ollama pull ' + h.model;
      $('model-banner').style.display = 'block';
    } else if (s.state === 'unreachable') {
      $('model-banner').textContent = 'Ollama is not reachable: ' + s.detail;
      $('model-banner').style.display = 'block';
    }
  }).catch(() => {});

  $('image').addEventListener('change', () => {
    const file = $('image').files[0];
    if (!file) return;
    const url = URL.createObjectURL(file);
    $('preview').src = url;
    $('preview').hidden = false;
    $('image-info').hidden = false;
    $('image-info').textContent = file.name + ' | ' + (file.size / 1024).toFixed(1) + ' KB';
  });

  $('analyze-btn').addEventListener('click', async () => {
    $('error').textContent = '';
    const file = $('image').files[0];
    const objective = $('objective').value;
    if (!file) { $('error').textContent = 'Please upload a dashboard image.'; return; }
    if (!objective.trim()) { $('error').textContent = 'Please describe the business objective.'; return; }

    const form = new FormData();
    form.append('image', file, file.name);
    form.append('objective', objective);

    $('analyze-btn').disabled = true;
    $('analyze-btn').textContent = 'Analyzing...';
    try {
      const resp = await fetch('/api/analyze', { method: 'POST', body: form });
      const body = await resp.json();
      if (!resp.ok) throw new Error(body.error || resp.statusText);
      result = body;
      $('analysis').classList.remove('muted');
      $('analysis').textContent = body.analysis;
      $('objective-view').classList.remove('muted');
      $('objective-view').textContent = body.objective;
      const img = body.image;
      $('image-info').textContent = img.filename + ' | ' + img.format + ' | ' + img.width + 'x' + img.height +
        ' | ' + img.color_mode + ' | ' + (img.size_bytes / 1024).toFixed(1) + ' KB';
      $('download-btn').hidden = false;
    } catch (e) {
      $('error').textContent = e.message;
    } finally {
      $('analyze-btn').disabled = false;
      $('analyze-btn').textContent = 'Analyze dashboard';
    }
  });

  $('download-btn').addEventListener('click', async () => {
    if (!result) return;
    $('error').textContent = '';
    try {
      const resp = await fetch('/api/report', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body: JSON.stringify({
          objective: result.objective,
          analysis: result.analysis,
          filename: result.image.filename,
          model: result.model,
        }),
      });
      if (!resp.ok) {
        const body = await resp.json().catch(() => ({}));
        throw new Error(body.error || resp.statusText);
      }
      const disposition = resp.headers.get('Content-Disposition') || '';
      const match = disposition.match(/filename="([^"]+)"/);
      const blob = await resp.blob();
      const a = document.createElement('a');
      a.href = URL.createObjectURL(blob);
      a.download = match ? match[1] : 'dashboard_analysis.pdf';
      a.click();
      URL.revokeObjectURL(a.href);
    } catch (e) {
      $('error').textContent = e.message;
    }
  });
})();
</script>
</body>
</html>
"##;

/// Fill the page template.
pub fn render_index(config: &ReportConfig, model: &str) -> String {
    TEMPLATE
        .replace("{{BRAND}}", &escape_html(&config.brand_name))
        .replace("{{SUBTITLE}}", &escape_html(&config.subtitle))
        .replace("{{HINT}}", &escape_html(OBJECTIVE_HINT))
        .replace("{{PRIMARY}}", &config.primary.to_css())
        .replace("{{ACCENT}}", &config.accent.to_css())
        .replace("{{TEXT}}", &config.text.to_css())
        .replace("{{MUTED}}", &config.muted.to_css())
        .replace("{{BACKGROUND}}", &config.background.to_css())
        .replace("{{MODEL}}", &escape_html(model))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
