//! Script injected into every preview document.
//!
//! Message `type` strings must stay in sync with the constants in
//! [`crate::bridge`]; `tests::test_script_uses_bridge_message_types` checks that.

/// Marker attribute identifying the injected script.
pub const BRIDGE_ATTRIBUTE: &str = "data-vibecoder-bridge";

pub const INSTRUMENTATION_SCRIPT: &str = r#"<script data-vibecoder-bridge>
(function () {
  window.__vibePointSelect = false;

  function post(payload) {
    try {
      if (window.parent && window.parent !== window) {
        window.parent.postMessage(payload, '*');
      }
    } catch (e) {}
  }

  window.addEventListener('message', function (event) {
    var data = event.data;
    if (data && data.type === 'toggle-point-select') {
      window.__vibePointSelect = !!data.enabled;
      document.documentElement.style.cursor = window.__vibePointSelect ? 'crosshair' : '';
    }
  });

  document.addEventListener('click', function (event) {
    if (!window.__vibePointSelect) return;
    event.preventDefault();
    event.stopPropagation();
    var el = event.target;
    if (!el || !el.getBoundingClientRect) return;
    var rect = el.getBoundingClientRect();
    var classes = typeof el.className === 'string' ? el.className : (el.getAttribute('class') || '');
    post({
      type: 'point-select',
      tag: el.tagName.toLowerCase(),
      text: (el.innerText || el.textContent || '').trim().slice(0, 200),
      classes: classes,
      id: el.id || null,
      rect: { x: rect.x, y: rect.y, width: rect.width, height: rect.height }
    });
  }, true);

  window.onerror = function (message, source, lineno, colno) {
    post({
      type: 'iframe-error',
      message: String(message),
      source: source || null,
      line: lineno || null,
      column: colno || null
    });
  };

  window.addEventListener('unhandledrejection', function (event) {
    var reason = event.reason;
    post({
      type: 'iframe-error',
      message: 'Unhandled rejection: ' + (reason && reason.message ? reason.message : String(reason)),
      source: null,
      line: null,
      column: null
    });
  });

  var originalError = console.error;
  console.error = function () {
    var parts = Array.prototype.slice.call(arguments).map(function (arg) {
      if (arg instanceof Error) return arg.message;
      if (typeof arg === 'string') return arg;
      try { return JSON.stringify(arg); } catch (e) { return String(arg); }
    });
    post({ type: 'iframe-error', message: parts.join(' '), source: 'console.error', line: null, column: null });
    return originalError.apply(console, arguments);
  };
})();
</script>
"#;
