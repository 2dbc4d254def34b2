use yew::prelude::*;

mod rpc;
mod storage;
mod widget;

use widget::ChatWidget;

#[function_component]
fn App() -> Html {
    html! {
        <ChatWidget />
    }
}

fn main() {
    yew::Renderer::<App>::new().render();
}
