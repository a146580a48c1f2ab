use crate::models::{DiscountRange, GameSettings};

pub fn render_index(settings: &GameSettings) -> String {
    INDEX_HTML
        .replace("{{STYLE}}", STYLE)
        .replace("{{ATTEMPTS}}", &settings.attempts_number.to_string())
        .replace("{{RULES}}", &rules_rows(settings))
}

pub fn render_admin() -> String {
    ADMIN_HTML.replace("{{STYLE}}", STYLE)
}

fn rules_rows(settings: &GameSettings) -> String {
    let mut rows: String = settings
        .discount_ranges
        .iter()
        .map(|range| {
            format!(
                "<tr><td>{}</td><td>{}%</td></tr>",
                describe_range(range),
                range.discount
            )
        })
        .collect();
    rows.push_str(&format!(
        "<tr><td>anything else</td><td>{}%</td></tr>",
        settings.fallback_discount
    ));
    rows
}

fn describe_range(range: &DiscountRange) -> String {
    match range.max {
        Some(max) if max == range.min => format!("{max} ms"),
        Some(max) => format!("{}&ndash;{max} ms", range.min),
        None if range.min == 0 => "any deviation".to_string(),
        None => format!("{} ms or more", range.min),
    }
}

const STYLE: &str = r#"
    @import url('https://fonts.googleapis.com/css2?family=Space+Grotesk:wght@400;500;600&family=Fraunces:wght@600&display=swap');

    :root {
      --bg-1: #f8f3e6;
      --bg-2: #f5d3a7;
      --ink: #2b2a28;
      --accent: #ff6b4a;
      --accent-2: #2f4858;
      --card: rgba(255, 255, 255, 0.86);
      --shadow: 0 24px 60px rgba(47, 72, 88, 0.18);
    }

    * {
      box-sizing: border-box;
    }

    body {
      margin: 0;
      min-height: 100vh;
      background: radial-gradient(circle at top, var(--bg-2), transparent 60%),
        linear-gradient(135deg, var(--bg-1), #ffe9d4 60%, #f9f2e9 100%);
      color: var(--ink);
      font-family: "Space Grotesk", "Trebuchet MS", sans-serif;
      display: grid;
      place-items: center;
      padding: 32px 18px 48px;
    }

    .app {
      width: min(860px, 100%);
      background: var(--card);
      backdrop-filter: blur(12px);
      border-radius: 28px;
      box-shadow: var(--shadow);
      padding: 36px;
      display: grid;
      gap: 28px;
    }

    h1 {
      font-family: "Fraunces", "Georgia", serif;
      font-weight: 600;
      font-size: clamp(2rem, 4vw, 2.8rem);
      margin: 0;
    }

    h2 {
      margin: 0;
      font-size: 1.3rem;
    }

    .subtitle {
      margin: 0;
      color: #5f5c57;
    }

    .panel {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 16px;
    }

    .stat {
      background: white;
      border-radius: 18px;
      padding: 18px;
      border: 1px solid rgba(47, 72, 88, 0.08);
      display: grid;
      gap: 8px;
    }

    .label {
      font-size: 0.85rem;
      text-transform: uppercase;
      letter-spacing: 0.12em;
      color: #8b857d;
    }

    .value {
      font-size: 1.7rem;
      font-weight: 600;
      color: var(--accent-2);
    }

    .clock {
      font-family: "Space Grotesk", monospace;
      font-size: clamp(2.4rem, 8vw, 4rem);
      font-weight: 600;
      text-align: center;
      color: var(--accent-2);
      letter-spacing: 0.04em;
    }

    form, .row {
      display: grid;
      grid-template-columns: repeat(auto-fit, minmax(180px, 1fr));
      gap: 12px;
    }

    input {
      border: 1px solid rgba(47, 72, 88, 0.2);
      border-radius: 14px;
      padding: 14px 16px;
      font: inherit;
    }

    button {
      appearance: none;
      border: none;
      border-radius: 999px;
      padding: 16px 20px;
      font: inherit;
      font-weight: 600;
      cursor: pointer;
      background: var(--accent-2);
      color: white;
      transition: transform 150ms ease;
    }

    button:active {
      transform: scale(0.98);
    }

    button:disabled {
      opacity: 0.5;
      cursor: not-allowed;
    }

    .btn-press {
      background: var(--accent);
      font-size: 1.3rem;
      padding: 22px;
      box-shadow: 0 10px 24px rgba(255, 107, 74, 0.3);
    }

    table {
      width: 100%;
      border-collapse: collapse;
      background: white;
      border-radius: 18px;
      overflow: hidden;
    }

    th, td {
      text-align: left;
      padding: 10px 14px;
      border-bottom: 1px solid rgba(47, 72, 88, 0.08);
    }

    .hidden {
      display: none;
    }

    .status {
      min-height: 1.2em;
      color: #6b645d;
    }

    .status[data-type="error"] {
      color: #c63b2b;
    }

    .status[data-type="ok"] {
      color: #2d7a4b;
    }

    @media (max-width: 600px) {
      .app {
        padding: 28px 22px;
      }
    }
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Second Hunt</title>
  <style>{{STYLE}}</style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Second Hunt</h1>
      <p class="subtitle">Stop the clock exactly on a whole second. Your best try sets your discount.</p>
    </header>

    <section id="auth">
      <form id="login-form">
        <input id="login-phone" placeholder="+972501234567" autocomplete="tel" required />
        <button type="submit">Log in</button>
      </form>
      <p class="subtitle">New here?</p>
      <form id="register-form">
        <input id="register-name" placeholder="Name" autocomplete="name" required />
        <input id="register-phone" placeholder="+972501234567" autocomplete="tel" required />
        <button type="submit">Register</button>
      </form>
    </section>

    <section id="game" class="hidden">
      <div class="clock" id="clock">00:00:00:000</div>
      <button class="btn-press" id="press" type="button">Stop!</button>
      <div class="panel">
        <div class="stat"><span class="label">Attempts left</span><span class="value" id="attempts-left">-</span></div>
        <div class="stat"><span class="label">Best (ms)</span><span class="value" id="best">-</span></div>
        <div class="stat"><span class="label">Discount</span><span class="value" id="discount">-</span></div>
      </div>
      <h2>Your attempts</h2>
      <table><tbody id="history"></tbody></table>
      <div class="row"><button id="logout" type="button">Log out</button></div>
    </section>

    <section>
      <h2>Rules</h2>
      <p class="subtitle">You get {{ATTEMPTS}} attempts. The button pauses for half a second after each press.</p>
      <table>
        <thead><tr><th>Deviation</th><th>Discount</th></tr></thead>
        <tbody>{{RULES}}</tbody>
      </table>
    </section>

    <div class="status" id="status"></div>
  </main>

  <script>
    const statusEl = document.getElementById('status');
    const authEl = document.getElementById('auth');
    const gameEl = document.getElementById('game');
    const clockEl = document.getElementById('clock');
    const pressEl = document.getElementById('press');
    const historyEl = document.getElementById('history');

    let token = sessionStorage.getItem('token');
    let poller = null;

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const api = async (method, path, body) => {
      const headers = { 'content-type': 'application/json' };
      if (token) {
        headers.authorization = `Bearer ${token}`;
      }
      const res = await fetch(path, { method, headers, body: body ? JSON.stringify(body) : undefined });
      if (!res.ok) {
        const msg = await res.text();
        const err = new Error(msg || 'Request failed');
        err.status = res.status;
        throw err;
      }
      return res.status === 204 ? null : res.json();
    };

    const showUser = (user) => {
      document.getElementById('attempts-left').textContent = user.attempts_left;
      document.getElementById('best').textContent = user.best_result ?? '-';
      document.getElementById('discount').textContent = `${user.discount}%`;
    };

    const showHistory = (attempts) => {
      historyEl.replaceChildren(...attempts.map((attempt, index) => {
        const row = document.createElement('tr');
        const num = document.createElement('td');
        const diff = document.createElement('td');
        num.textContent = `#${index + 1}`;
        diff.textContent = `${attempt.difference} ms`;
        row.append(num, diff);
        return row;
      }));
    };

    const startPolling = () => {
      if (poller) {
        return;
      }
      poller = setInterval(async () => {
        try {
          const reading = await api('GET', '/api/timer');
          clockEl.textContent = reading.clock;
        } catch (err) {
          stopPolling();
        }
      }, 50);
    };

    const stopPolling = () => {
      clearInterval(poller);
      poller = null;
    };

    const enter = async (session) => {
      token = session.token;
      sessionStorage.setItem('token', token);
      authEl.classList.add('hidden');
      gameEl.classList.remove('hidden');
      showUser(session.user);
      const history = await api('GET', '/api/attempts');
      showHistory(history.attempts);
      if (session.user.attempts_left > 0) {
        await api('POST', '/api/timer/start');
        startPolling();
      } else {
        pressEl.disabled = true;
      }
    };

    const leave = () => {
      stopPolling();
      token = null;
      sessionStorage.removeItem('token');
      gameEl.classList.add('hidden');
      authEl.classList.remove('hidden');
    };

    document.getElementById('login-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const phone = document.getElementById('login-phone').value;
      api('POST', '/api/login', { phone })
        .then(enter)
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('register-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const name = document.getElementById('register-name').value;
      const phone = document.getElementById('register-phone').value;
      api('POST', '/api/register', { name, phone })
        .then(enter)
        .catch((err) => setStatus(err.message, 'error'));
    });

    pressEl.addEventListener('click', async () => {
      pressEl.disabled = true;
      try {
        const outcome = await api('POST', '/api/attempt');
        clockEl.textContent = outcome.clock;
        showUser(outcome.user);
        const history = await api('GET', '/api/attempts');
        showHistory(history.attempts);
        setStatus(`Off by ${outcome.difference} ms`, 'ok');
        if (outcome.phase === 'exhausted') {
          stopPolling();
          return;
        }
      } catch (err) {
        setStatus(err.message, 'error');
        if (err.status === 403) {
          stopPolling();
          return;
        }
      }
      setTimeout(() => { pressEl.disabled = false; }, 500);
    });

    document.getElementById('logout').addEventListener('click', () => {
      api('POST', '/api/logout').catch(() => {}).finally(leave);
    });

    if (token) {
      api('GET', '/api/session')
        .then(enter)
        .catch(leave);
    }
  </script>
</body>
</html>
"#;

const ADMIN_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Second Hunt - Admin</title>
  <style>{{STYLE}}</style>
</head>
<body>
  <main class="app">
    <header>
      <h1>Admin</h1>
      <p class="subtitle">Players, attempts and discount tiers.</p>
    </header>

    <form id="admin-login">
      <input id="password" type="password" placeholder="Password" required />
      <button type="submit">Enter</button>
    </form>

    <section id="panel" class="hidden">
      <div class="panel">
        <div class="stat"><span class="label">Players</span><span class="value" id="total-users">0</span></div>
        <div class="stat"><span class="label">Attempts</span><span class="value" id="total-attempts">0</span></div>
        <div class="stat"><span class="label">Today</span><span class="value" id="today-attempts">0</span></div>
      </div>

      <h2>Settings</h2>
      <form id="attempts-form">
        <input id="attempts-number" type="number" min="1" required />
        <button type="submit">Save attempts</button>
      </form>
      <form id="ranges-form">
        <input id="ranges" placeholder='[{"min":0,"max":0,"discount":25}]' required />
        <input id="fallback" type="number" min="0" max="100" placeholder="Fallback %" />
        <button type="submit">Save table</button>
      </form>

      <h2>Players</h2>
      <form id="search-form">
        <input id="search" placeholder="Name or phone" />
        <button type="submit">Search</button>
      </form>
      <table>
        <thead><tr><th>Name</th><th>Phone</th><th>Left</th><th>Best</th><th>Discount</th><th></th></tr></thead>
        <tbody id="users"></tbody>
      </table>

      <h2>Export</h2>
      <form id="export-form">
        <input id="export-from" type="date" required />
        <input id="export-to" type="date" required />
        <button type="submit">Download CSV</button>
      </form>
    </section>

    <div class="status" id="status"></div>
  </main>

  <script>
    const statusEl = document.getElementById('status');
    const usersEl = document.getElementById('users');
    let token = null;

    const setStatus = (message, type) => {
      statusEl.textContent = message;
      statusEl.dataset.type = type || '';
    };

    const api = async (method, path, body) => {
      const headers = { 'content-type': 'application/json' };
      if (token) {
        headers.authorization = `Bearer ${token}`;
      }
      const res = await fetch(path, { method, headers, body: body ? JSON.stringify(body) : undefined });
      if (!res.ok) {
        const msg = await res.text();
        throw new Error(msg || 'Request failed');
      }
      return res;
    };

    const cell = (text) => {
      const td = document.createElement('td');
      td.textContent = text;
      return td;
    };

    const loadUsers = async () => {
      const search = document.getElementById('search').value;
      const res = await api('GET', `/api/admin/users?search=${encodeURIComponent(search)}`);
      const users = await res.json();
      usersEl.replaceChildren(...users.map((user) => {
        const row = document.createElement('tr');
        const reset = document.createElement('button');
        reset.type = 'button';
        reset.textContent = 'Reset';
        reset.addEventListener('click', () => {
          api('POST', `/api/admin/users/${user.id}/reset`)
            .then(() => { setStatus(`Attempts reset for ${user.name}`, 'ok'); return loadUsers(); })
            .catch((err) => setStatus(err.message, 'error'));
        });
        const action = document.createElement('td');
        action.append(reset);
        row.append(cell(user.name), cell(user.phone), cell(user.attempts_left),
          cell(user.best_result ?? '-'), cell(`${user.discount}%`), action);
        return row;
      }));
    };

    const loadStats = async () => {
      const stats = await (await api('GET', '/api/admin/stats')).json();
      document.getElementById('total-users').textContent = stats.total_users;
      document.getElementById('total-attempts').textContent = stats.total_attempts;
      const today = stats.last_7_days[stats.last_7_days.length - 1];
      document.getElementById('today-attempts').textContent = today.attempts;
    };

    const loadSettings = async () => {
      const settings = await (await fetch('/api/settings')).json();
      document.getElementById('attempts-number').value = settings.attempts_number;
      document.getElementById('ranges').value = JSON.stringify(settings.discount_ranges);
      document.getElementById('fallback').value = settings.fallback_discount;
    };

    const refresh = () => Promise.all([loadUsers(), loadStats(), loadSettings()]);

    document.getElementById('admin-login').addEventListener('submit', async (event) => {
      event.preventDefault();
      try {
        const password = document.getElementById('password').value;
        const res = await api('POST', '/api/admin/login', { password });
        token = (await res.json()).token;
        document.getElementById('admin-login').classList.add('hidden');
        document.getElementById('panel').classList.remove('hidden');
        await refresh();
      } catch (err) {
        setStatus(err.message, 'error');
      }
    });

    document.getElementById('attempts-form').addEventListener('submit', (event) => {
      event.preventDefault();
      const attempts_number = Number(document.getElementById('attempts-number').value);
      api('PUT', '/api/admin/settings/attempts', { attempts_number })
        .then(() => setStatus('Attempts number saved', 'ok'))
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('ranges-form').addEventListener('submit', (event) => {
      event.preventDefault();
      let discount_ranges;
      try {
        discount_ranges = JSON.parse(document.getElementById('ranges').value);
      } catch (err) {
        setStatus('Discount table must be JSON', 'error');
        return;
      }
      const fallbackRaw = document.getElementById('fallback').value;
      const fallback_discount = fallbackRaw === '' ? null : Number(fallbackRaw);
      api('PUT', '/api/admin/settings/ranges', { discount_ranges, fallback_discount })
        .then(() => setStatus('Discount table saved', 'ok'))
        .catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('search-form').addEventListener('submit', (event) => {
      event.preventDefault();
      loadUsers().catch((err) => setStatus(err.message, 'error'));
    });

    document.getElementById('export-form').addEventListener('submit', async (event) => {
      event.preventDefault();
      try {
        const from = document.getElementById('export-from').value;
        const to = document.getElementById('export-to').value;
        const res = await api('GET', `/api/admin/export?from=${from}&to=${to}`);
        const url = URL.createObjectURL(await res.blob());
        const link = document.createElement('a');
        link.href = url;
        link.download = `users_${from}_${to}.csv`;
        link.click();
        URL.revokeObjectURL(url);
      } catch (err) {
        setStatus(err.message, 'error');
      }
    });
  </script>
</body>
</html>
"#;
