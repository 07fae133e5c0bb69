//! Sign-in form.

use std::any::Any;

use calldock_core::surface::{FormField, Surface};
use calldock_core::tree::{Ctx, Element, NodeId, Tree};
use calldock_core::types::{AppId, UserId};

use crate::message::{CalldockProtocol, DownMsg, Gesture, SessionSnapshot, UpMsg};

const FIELD_USER: usize = 0;
const FIELD_TOKEN: usize = 1;
const FIELD_COUNT: usize = 2;

/// User id + access token form. The app id is fixed by the host.
pub struct LoginView {
    app_id: AppId,
    user_id: String,
    access_token: String,
    active: usize,
    submitting: bool,
    error: Option<String>,
}

impl LoginView {
    pub fn new(session: &SessionSnapshot) -> Self {
        Self {
            app_id: session.app_id.clone(),
            user_id: String::new(),
            access_token: String::new(),
            active: FIELD_USER,
            submitting: false,
            error: None,
        }
    }

    fn active_field_mut(&mut self) -> &mut String {
        match self.active {
            FIELD_TOKEN => &mut self.access_token,
            _ => &mut self.user_id,
        }
    }

    fn submit(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        if self.submitting {
            return;
        }
        let user_id = self.user_id.trim();
        if user_id.is_empty() {
            self.error = Some("user id is required".to_string());
            return;
        }
        self.submitting = true;
        self.error = None;
        let access_token = (!self.access_token.is_empty()).then(|| self.access_token.clone());
        ctx.send_to_parent(UpMsg::LoginSubmitted {
            user_id: UserId::new(user_id),
            access_token,
        });
    }
}

impl Element<CalldockProtocol> for LoginView {
    fn kind(&self) -> &'static str {
        "login"
    }

    fn recv_down(&mut self, _ctx: &mut Ctx<'_, CalldockProtocol>, msg: DownMsg) {
        match msg {
            DownMsg::AuthFailed { message } => {
                self.submitting = false;
                self.error = Some(message);
            }
            DownMsg::ConnectionLost { reason } => {
                self.submitting = false;
                self.error = Some(reason);
            }
            DownMsg::SessionChanged(session) => {
                if session.is_logged_in() {
                    self.submitting = false;
                }
            }
            DownMsg::CallChanged(_)
            | DownMsg::DialFailed { .. }
            | DownMsg::LogPageLoaded { .. }
            | DownMsg::LogLoadFailed { .. }
            | DownMsg::DevicesChanged(_) => {}
        }
    }

    fn on_gesture(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, gesture: &Gesture) -> bool {
        match gesture {
            Gesture::Tab | Gesture::Down => {
                self.active = (self.active + 1) % FIELD_COUNT;
                true
            }
            Gesture::Up => {
                self.active = self.active.checked_sub(1).unwrap_or(FIELD_COUNT - 1);
                true
            }
            Gesture::Char(c) => {
                self.active_field_mut().push(*c);
                true
            }
            Gesture::Backspace => {
                self.active_field_mut().pop();
                true
            }
            Gesture::Enter => {
                self.submit(ctx);
                true
            }
            Gesture::Esc => {
                ctx.send_to_parent(UpMsg::WidgetCloseRequested);
                true
            }
            _ => false,
        }
    }

    fn surface(&self, _tree: &Tree<CalldockProtocol>, _me: NodeId) -> Surface {
        let submit_label = if self.submitting {
            "Signing in…".to_string()
        } else {
            "Enter to sign in".to_string()
        };
        Surface::Form {
            title: "Sign in".to_string(),
            fields: vec![
                FormField::new("App ID", self.app_id.as_str()),
                FormField::new("User ID", &self.user_id).active(self.active == FIELD_USER),
                FormField::new("Access token", &self.access_token)
                    .active(self.active == FIELD_TOKEN)
                    .secret(),
            ],
            submit_label,
            error: self.error.clone(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
