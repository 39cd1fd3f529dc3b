use crate::api::CreateInvestorRequest;
use crate::investors::draft::{InvestorDraft, TagField};
use crossterm::event::KeyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Email,
    Name,
    Thesis,
    FocusInput,
    FocusTags,
    DealBreakerInput,
    DealBreakerTags,
    Submit,
}

const FIELD_ORDER: [FormField; 8] = [
    FormField::Email,
    FormField::Name,
    FormField::Thesis,
    FormField::FocusInput,
    FormField::FocusTags,
    FormField::DealBreakerInput,
    FormField::DealBreakerTags,
    FormField::Submit,
];

#[derive(Debug, Clone, PartialEq)]
pub enum FormAction {
    None,
    Submit(CreateInvestorRequest),
    Close,
}

/// 新建投资人表单的编辑状态（含尚未确认的标签输入）
#[derive(Debug, Clone)]
pub struct DraftForm {
    pub draft: InvestorDraft,
    pub field: FormField,
    pub focus_input: String,
    pub deal_breaker_input: String,
    pub tag_cursor: usize,
    pub submitting: bool, // 已发出创建请求，等待结果
}

impl Default for DraftForm {
    fn default() -> Self {
        Self {
            draft: InvestorDraft::default(),
            field: FormField::Email,
            focus_input: String::new(),
            deal_breaker_input: String::new(),
            tag_cursor: 0,
            submitting: false,
        }
    }
}

impl DraftForm {
    pub fn can_submit(&self) -> bool {
        !self.submitting && self.draft.can_submit()
    }

    fn step(&mut self, forward: bool) {
        let idx = FIELD_ORDER
            .iter()
            .position(|f| *f == self.field)
            .unwrap_or(0);
        let n = FIELD_ORDER.len();
        let next = if forward { (idx + 1) % n } else { (idx + n - 1) % n };
        self.field = FIELD_ORDER[next];
        self.tag_cursor = 0;
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Email => Some(&mut self.draft.email),
            FormField::Name => Some(&mut self.draft.name),
            FormField::Thesis => Some(&mut self.draft.investment_thesis),
            FormField::FocusInput => Some(&mut self.focus_input),
            FormField::DealBreakerInput => Some(&mut self.deal_breaker_input),
            FormField::FocusTags | FormField::DealBreakerTags | FormField::Submit => None,
        }
    }

    fn tag_field(&self) -> Option<TagField> {
        match self.field {
            FormField::FocusInput | FormField::FocusTags => Some(TagField::FocusAreas),
            FormField::DealBreakerInput | FormField::DealBreakerTags => {
                Some(TagField::DealBreakers)
            }
            _ => None,
        }
    }

    /// 提交输入框中的标签；成功后清空输入框
    pub fn commit_tag(&mut self, field: TagField) -> bool {
        let input = match field {
            TagField::FocusAreas => &mut self.focus_input,
            TagField::DealBreakers => &mut self.deal_breaker_input,
        };
        if self.draft.add_tag(field, input) {
            input.clear();
            true
        } else {
            false
        }
    }

    pub fn remove_selected_tag(&mut self) -> Option<String> {
        let field = match self.field {
            FormField::FocusTags => TagField::FocusAreas,
            FormField::DealBreakerTags => TagField::DealBreakers,
            _ => return None,
        };
        let removed = self.draft.remove_tag(field, self.tag_cursor);
        let len = self.draft.tags(field).len();
        if self.tag_cursor >= len {
            self.tag_cursor = len.saturating_sub(1);
        }
        removed
    }

    pub fn handle_key(&mut self, key: KeyCode) -> FormAction {
        match key {
            KeyCode::Esc => return FormAction::Close,
            KeyCode::Tab | KeyCode::Down => self.step(true),
            KeyCode::BackTab | KeyCode::Up => self.step(false),
            KeyCode::Enter => match self.field {
                FormField::FocusInput | FormField::DealBreakerInput => {
                    if let Some(field) = self.tag_field() {
                        self.commit_tag(field);
                    }
                }
                FormField::Submit => {
                    if self.can_submit() {
                        self.submitting = true;
                        return FormAction::Submit(self.draft.to_request());
                    }
                }
                _ => self.step(true),
            },
            KeyCode::Left => {
                self.tag_cursor = self.tag_cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if let Some(field) = self.tag_field() {
                    let len = self.draft.tags(field).len();
                    if self.tag_cursor + 1 < len {
                        self.tag_cursor += 1;
                    }
                }
            }
            KeyCode::Delete => {
                self.remove_selected_tag();
            }
            KeyCode::Backspace => {
                if let Some(text) = self.text_mut() {
                    text.pop();
                } else {
                    self.remove_selected_tag();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.text_mut() {
                    text.push(c);
                } else if c == 'x' {
                    self.remove_selected_tag();
                }
            }
            _ => {}
        }
        FormAction::None
    }
}
